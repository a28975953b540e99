use serde::{Deserialize, Serialize};

use crate::identity::IdentityLock;

pub const KEY: &str = "welcome";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WelcomeState {
    pub student_name: String,
    pub class_section: String,
    pub identity_locked: bool,
}

impl WelcomeState {
    /// Copy the lock's current draft/recorded values into the bucket state.
    pub fn mirror(&mut self, lock: &IdentityLock) {
        self.student_name = lock.full_name();
        self.class_section = lock.section().to_string();
        self.identity_locked = lock.is_locked();
    }
}
