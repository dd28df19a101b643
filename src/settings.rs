use std::collections::HashMap;

pub const USER_INFO_KEY: &str = "fox_user_info";
pub const DARK_MODE_KEY: &str = "darkMode";

const DEFAULT_USERNAME: &str = "DrFox";
const DEFAULT_EMAIL: &str = "fox@example.com";

/// Key/value storage for user-facing settings. Browser builds back this with local storage.
pub trait SettingsStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UserInfo {
    pub username: String,
    pub email: String,
    pub xp: u64,
    pub streak: u32,
}

/// Stored form; every field is optional so partial records still load.
#[derive(Debug, Default, serde::Deserialize)]
struct StoredUserInfo {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    xp: Option<u64>,
    #[serde(default)]
    streak: Option<u32>,
}

/// Fields to change with [`UserInfo::update`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfoUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub xp: Option<u64>,
    pub streak: Option<u32>,
}

impl Default for UserInfo {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            xp: 0,
            streak: 0,
        }
    }
}

impl UserInfo {
    /// Reads the stored profile, falling back to the placeholder profile when nothing usable
    /// is stored.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Self {
        let Some(data) = store.load(USER_INFO_KEY) else {
            return Self::default();
        };

        match serde_json::from_str::<StoredUserInfo>(&data) {
            Ok(stored) => {
                let defaults = Self::default();
                Self {
                    username: stored
                        .username
                        .filter(|name| !name.is_empty())
                        .unwrap_or(defaults.username),
                    email: stored
                        .email
                        .filter(|email| !email.is_empty())
                        .unwrap_or(defaults.email),
                    xp: stored.xp.unwrap_or(0),
                    streak: stored.streak.unwrap_or(0),
                }
            }
            Err(error) => {
                log::warn!("failed to parse stored user info: {}", error);
                Self::default()
            }
        }
    }

    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) {
        match serde_json::to_string(self) {
            Ok(data) => store.save(USER_INFO_KEY, &data),
            Err(error) => log::warn!("failed to serialize user info: {}", error),
        }
    }

    /// Applies `fields` and saves immediately.
    pub fn update<S: SettingsStore + ?Sized>(&mut self, fields: UserInfoUpdate, store: &mut S) {
        if let Some(username) = fields.username {
            self.username = username;
        }
        if let Some(email) = fields.email {
            self.email = email;
        }
        if let Some(xp) = fields.xp {
            self.xp = xp;
        }
        if let Some(streak) = fields.streak {
            self.streak = streak;
        }

        self.save(store);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    pub dark_mode: bool,
}

impl Preferences {
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Self {
        Self {
            dark_mode: store.load(DARK_MODE_KEY).as_deref() == Some("true"),
        }
    }

    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) {
        store.save(DARK_MODE_KEY, if self.dark_mode { "true" } else { "false" });
    }

    pub fn toggle_dark_mode<S: SettingsStore + ?Sized>(&mut self, store: &mut S) {
        self.dark_mode = !self.dark_mode;
        self.save(store);
    }

    pub fn theme(&self) -> &'static str {
        if self.dark_mode { "dark" } else { "light" }
    }
}
