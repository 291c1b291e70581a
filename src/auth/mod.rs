pub mod callback;
pub mod oauth;
pub mod token_manager;
pub mod tokens_file;
