use subtle::ConstantTimeEq;

use crate::config::ApiKeyConfig;
use crate::twin::Caller;

/// Static API keys, each mapped to a user id and role.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    entries: Vec<ApiKeyConfig>,
}

impl ApiKeyAuth {
    pub fn new(entries: Vec<ApiKeyConfig>) -> Self {
        Self { entries }
    }

    /// Find the caller for `presented`.
    ///
    /// Every configured key is compared in constant time and the loop never
    /// exits early, so timing does not reveal which prefix matched.
    pub fn lookup(&self, presented: &str) -> Option<Caller> {
        let mut found = None;
        for entry in &self.entries {
            let matches: bool = entry.key.as_bytes().ct_eq(presented.as_bytes()).into();
            if matches && found.is_none() {
                found = Some(Caller::new(entry.user_id.clone(), entry.role));
            }
        }
        found
    }
}
