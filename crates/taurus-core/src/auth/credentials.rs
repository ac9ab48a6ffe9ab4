use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::error::CredentialError;
use super::prompt::Prompt;
use crate::utils::ini;

type Result<T> = std::result::Result<T, CredentialError>;

/// Credential name to value, in insertion order.
pub type CredentialMap = IndexMap<String, String>;

/// Folder under the home directory holding one file per service
pub const DEFAULT_CREDENTIALS_FOLDER: &str = ".credentials";

/// Values never printed in full
const SECRET_FIELDS: &[&str] = &["app_secret", "long_access_token", "api_key"];

/// A service whose credentials can be stored.
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceProfile {
    pub name: &'static str,
    /// Section of the credential file holding this service's values
    pub profile: &'static str,
    /// Fields asked for during interactive setup, in order
    pub fields: &'static [&'static str],
}

pub static ETORO: ServiceProfile = ServiceProfile {
    name: "etoro",
    profile: "api",
    fields: &["app_id", "app_secret", "long_access_token"],
};

static SERVICES: &[&ServiceProfile] = &[&ETORO];

impl ServiceProfile {
    pub fn lookup(name: &str) -> Option<&'static ServiceProfile> {
        SERVICES.iter().copied().find(|s| s.name == name)
    }

    pub fn is_secret(field: &str) -> bool {
        SECRET_FIELDS.contains(&field)
    }

    /// `long_access_token` is asked for as "long access token"
    pub fn field_label(field: &str) -> String {
        field.split('_').collect::<Vec<_>>().join(" ")
    }
}

/// How [`CredentialStore::create`] treats an existing file.
pub enum Overwrite<'a> {
    /// Ask before replacing it
    Confirm(&'a mut dyn Prompt),
    /// Replace it without asking
    Force,
}

/// Credentials of one service, backed by `<dir>/<service>` on disk.
pub struct CredentialStore {
    service: &'static ServiceProfile,
    credential_dir: PathBuf,
    config_file: PathBuf,
    credentials: CredentialMap,
}

impl CredentialStore {
    /// Store under `~/.credentials`
    pub fn new(service: &'static ServiceProfile) -> Result<Self> {
        Self::with_folder(service, DEFAULT_CREDENTIALS_FOLDER)
    }

    /// Store under `~/<folder>`
    pub fn with_folder(service: &'static ServiceProfile, folder: &str) -> Result<Self> {
        let home = dirs::home_dir().ok_or(CredentialError::NoHomeDirectory)?;
        Ok(Self::in_dir(service, home.join(folder)))
    }

    /// Store under an explicit directory
    pub fn in_dir(service: &'static ServiceProfile, credential_dir: impl Into<PathBuf>) -> Self {
        let credential_dir = credential_dir.into();
        let config_file = credential_dir.join(service.name);
        Self {
            service,
            credential_dir,
            config_file,
            credentials: CredentialMap::new(),
        }
    }

    /// Use a file name other than the service name
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.config_file = self.credential_dir.join(filename);
        self
    }

    pub fn name(&self) -> &str {
        self.service.name
    }

    pub fn service(&self) -> &'static ServiceProfile {
        self.service
    }

    pub fn profile(&self) -> &str {
        self.service.profile
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    pub fn dir(&self) -> &Path {
        &self.credential_dir
    }

    pub fn credentials(&self) -> &CredentialMap {
        &self.credentials
    }

    pub fn exists(&self) -> bool {
        self.config_file.is_file()
    }

    /// Look up a loaded or added credential
    pub fn get(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| CredentialError::MissingKey(key.to_string()))
    }

    /// Merge values into memory. The file is left alone.
    pub fn add<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in values {
            self.credentials.insert(k.into(), v.into());
        }
    }

    /// Write `params` as the service's section, replacing any existing file.
    ///
    /// Returns `Ok(false)` when the overwrite was declined.
    pub fn create(&self, params: &CredentialMap, overwrite: Overwrite<'_>) -> Result<bool> {
        if let Some(bad) = params.keys().find(|k| !ini::is_valid_key(k)) {
            return Err(CredentialError::InvalidKey(bad.clone()));
        }
        if let Some((key, _)) = params.iter().find(|(_, v)| !ini::is_valid_value(v)) {
            return Err(CredentialError::InvalidValue(key.clone()));
        }

        if let Overwrite::Confirm(prompt) = overwrite {
            if !self.confirm_overwrite(prompt)? {
                return Ok(false);
            }
        }

        info!(
            dir = %self.credential_dir.display(),
            service = self.name(),
            "Creating credential file"
        );
        std::fs::create_dir_all(&self.credential_dir)
            .map_err(|e| CredentialError::io(&self.credential_dir, e))?;

        let contents = ini::write_section(self.profile(), params);
        std::fs::write(&self.config_file, contents)
            .map_err(|e| CredentialError::io(&self.config_file, e))?;
        Ok(true)
    }

    /// Read the service's section into memory.
    pub fn load(&mut self) -> Result<()> {
        let contents = std::fs::read_to_string(&self.config_file)
            .map_err(|e| CredentialError::io(&self.config_file, e))?;
        let mut sections = ini::parse(&contents).map_err(|source| CredentialError::Malformed {
            path: self.config_file.clone(),
            source,
        })?;

        let entries = sections
            .shift_remove(self.profile())
            .ok_or_else(|| CredentialError::MissingSection {
                section: self.profile().to_string(),
                path: self.config_file.clone(),
            })?;
        if entries.is_empty() {
            return Err(CredentialError::EmptySection {
                section: self.profile().to_string(),
                path: self.config_file.clone(),
            });
        }

        debug!(service = self.name(), count = entries.len(), "Loaded credentials");
        self.credentials.extend(entries);
        Ok(())
    }

    /// Interactive setup.
    ///
    /// Without `params`, every field of the service profile is asked for.
    /// An existing file is only replaced after the prompt confirms.
    pub fn configure(
        &self,
        params: Option<CredentialMap>,
        prompt: &mut dyn Prompt,
    ) -> Result<bool> {
        if !self.confirm_overwrite(prompt)? {
            return Ok(false);
        }

        let params = match params {
            Some(params) => params,
            None => self.collect(prompt)?,
        };

        self.create(&params, Overwrite::Force)
    }

    /// Ask the prompt for every field of the service profile, in order
    pub fn collect(&self, prompt: &mut dyn Prompt) -> Result<CredentialMap> {
        let mut params = CredentialMap::new();
        for field in self.service.fields {
            let label = ServiceProfile::field_label(field);
            let value = prompt
                .ask(&label, ServiceProfile::is_secret(field))
                .map_err(CredentialError::Prompt)?;
            params.insert(field.to_string(), value.trim().to_string());
        }
        Ok(params)
    }

    /// True when there is nothing to overwrite or the prompt agreed to it
    fn confirm_overwrite(&self, prompt: &mut dyn Prompt) -> Result<bool> {
        if !self.exists() {
            return Ok(true);
        }
        warn!(path = %self.config_file.display(), "A credential file already exists");
        let proceed = prompt
            .confirm("A credential file was found. Overwrite it?")
            .map_err(CredentialError::Prompt)?;
        if !proceed {
            warn!(service = self.name(), "Aborting configuration");
        }
        Ok(proceed)
    }
}

impl fmt::Display for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .credentials
            .iter()
            .map(|(k, v)| {
                if ServiceProfile::is_secret(k) {
                    format!("{}: {}", k, mask(v))
                } else {
                    format!("{}: {}", k, v)
                }
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Keep the last four characters of a secret
fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        "*".repeat(count)
    } else {
        let tail: String = value.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::prompt::ScriptedPrompt;
    use tempfile::TempDir;

    fn params(pairs: &[(&str, &str)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample() -> CredentialMap {
        params(&[
            ("app_id", "12345"),
            ("app_secret", "very-secret"),
            ("long_access_token", "tok_abcdef"),
            ("api_url", "https://api.etoro.com/"),
        ])
    }

    #[test]
    fn test_path_is_derived_from_service() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path().join(".credentials"));
        assert_eq!(store.path(), temp_dir.path().join(".credentials").join("etoro"));

        let store = store.with_filename("etoro-demo");
        assert_eq!(store.path(), temp_dir.path().join(".credentials").join("etoro-demo"));
    }

    #[test]
    fn test_create_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path().join("creds"));
        assert!(!store.exists());

        assert!(store.create(&sample(), Overwrite::Force).unwrap());
        assert!(store.exists());

        store.load().unwrap();
        assert_eq!(store.credentials(), &sample());
        assert_eq!(store.get("app_id"), Some("12345"));
    }

    #[test]
    fn test_create_then_load_round_trip_values() {
        let stored = [
            "",
            "ünïcødé ✓ 日本",
            "line1\n#line2",
            "line1\n;x",
            "a\n  b",
            "a\n\n\tb",
            "#starts-like-a-comment",
            "k=v:w",
        ];
        for value in stored {
            let temp_dir = TempDir::new().unwrap();
            let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
            let written = params(&[("app_secret", value)]);
            assert!(store.create(&written, Overwrite::Force).unwrap());

            store.load().unwrap();
            assert_eq!(store.get("app_secret"), Some(value), "value {:?}", value);
        }

        let rejected = [" padded ", "trailing ", "tail\r", "a\r\nb", "a \nb", "\nb", "a\n"];
        for value in rejected {
            let temp_dir = TempDir::new().unwrap();
            let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
            let err = store
                .create(&params(&[("app_secret", value)]), Overwrite::Force)
                .unwrap_err();
            assert!(
                matches!(&err, CredentialError::InvalidValue(k) if k == "app_secret"),
                "value {:?} gave {:?}",
                value,
                err
            );
            assert!(!store.exists());
        }
    }

    #[test]
    fn test_create_writes_profile_section() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.create(&params(&[("app_id", "1")]), Overwrite::Force).unwrap();

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "[api]\napp_id = 1\n\n");
    }

    #[test]
    fn test_create_rejects_unwritable_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        let err = store
            .create(&params(&[("bad=key", "1")]), Overwrite::Force)
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidKey(_)));
        assert!(!store.exists());
    }

    #[test]
    fn test_create_fails_when_directory_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let store = CredentialStore::in_dir(&ETORO, blocker.join("creds"));
        let err = store.create(&sample(), Overwrite::Force).unwrap_err();
        assert!(matches!(err, CredentialError::Io { .. }));
    }

    #[test]
    fn test_create_declined_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.create(&params(&[("app_id", "old")]), Overwrite::Force).unwrap();

        let mut prompt = ScriptedPrompt::new().with_confirmation(false);
        let written = store
            .create(&params(&[("app_id", "new")]), Overwrite::Confirm(&mut prompt))
            .unwrap();
        assert!(!written);
        assert_eq!(prompt.confirmed.len(), 1);

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("app_id = old"));
    }

    #[test]
    fn test_create_confirmed_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.create(&params(&[("app_id", "old")]), Overwrite::Force).unwrap();

        let mut prompt = ScriptedPrompt::new().with_confirmation(true);
        assert!(store
            .create(&params(&[("app_id", "new")]), Overwrite::Confirm(&mut prompt))
            .unwrap());

        store.load().unwrap();
        assert_eq!(store.get("app_id"), Some("new"));
    }

    #[test]
    fn test_create_without_existing_file_does_not_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        let mut prompt = ScriptedPrompt::new();
        assert!(store.create(&sample(), Overwrite::Confirm(&mut prompt)).unwrap());
        assert!(prompt.confirmed.is_empty());
    }

    #[test]
    fn test_load_missing_section() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        std::fs::write(store.path(), "[other]\napp_id = 1\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, CredentialError::MissingSection { .. }));
    }

    #[test]
    fn test_load_empty_section() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        std::fs::write(store.path(), "[api]\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, CredentialError::EmptySection { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        std::fs::write(store.path(), "app_id = 1\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        assert!(matches!(store.load().unwrap_err(), CredentialError::Io { .. }));
    }

    #[test]
    fn test_add_merges_without_touching_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.create(&params(&[("app_id", "1")]), Overwrite::Force).unwrap();
        store.load().unwrap();

        store.add([("api_key", "k"), ("app_id", "2")]);
        assert_eq!(store.get("api_key"), Some("k"));
        assert_eq!(store.get("app_id"), Some("2"));

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "[api]\napp_id = 1\n\n");
    }

    #[test]
    fn test_unset_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        assert_eq!(store.get("app_id"), None);
        assert!(matches!(
            store.require("app_id").unwrap_err(),
            CredentialError::MissingKey(k) if k == "app_id"
        ));
    }

    #[test]
    fn test_configure_prompts_for_each_field() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        let mut prompt = ScriptedPrompt::new()
            .with_answer("id-1")
            .with_answer(" secret ")
            .with_answer("token");

        assert!(store.configure(None, &mut prompt).unwrap());
        assert_eq!(prompt.asked, vec!["app id", "app secret", "long access token"]);

        store.load().unwrap();
        assert_eq!(
            store.credentials(),
            &params(&[("app_id", "id-1"), ("app_secret", "secret"), ("long_access_token", "token")])
        );
    }

    #[test]
    fn test_configure_declined_on_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.create(&sample(), Overwrite::Force).unwrap();

        let mut prompt = ScriptedPrompt::new().with_confirmation(false);
        assert!(!store.configure(None, &mut prompt).unwrap());
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn test_configure_with_params_skips_questions() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        let mut prompt = ScriptedPrompt::new();
        assert!(store.configure(Some(sample()), &mut prompt).unwrap());
        assert!(prompt.asked.is_empty());
        assert!(store.exists());
    }

    #[test]
    fn test_display_masks_secrets() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::in_dir(&ETORO, temp_dir.path());
        store.add([("app_id", "12345"), ("app_secret", "abcdefgh")]);
        assert_eq!(store.to_string(), "app_id: 12345\napp_secret: ****efgh");
    }

    #[test]
    fn test_service_lookup() {
        assert_eq!(ServiceProfile::lookup("etoro"), Some(&ETORO));
        assert_eq!(ServiceProfile::lookup("lotame"), None);
        assert_eq!(ServiceProfile::field_label("long_access_token"), "long access token");
    }
}
