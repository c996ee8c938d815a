pub mod credentials;
pub mod lists;

pub use credentials::{
    API_KEY_VAR, CompleteCredentials, CredentialStore, DEVICE_CODE_VAR, RemoteCredentials,
    USERNAME_VAR, env_file_value,
};
pub use lists::{ListLoad, ListName, ListStore, MembershipChange};
