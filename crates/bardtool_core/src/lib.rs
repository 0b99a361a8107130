pub mod article;
pub mod assets;
pub mod bard;
pub mod builders;
pub mod config;
pub mod document;
pub mod error;
pub mod filesystem;
pub mod html;
pub mod http;
pub mod images;
pub mod inject;
pub mod links;
pub mod locate;
pub mod reconcile;
pub mod redirects;
pub mod runtime;
pub mod site;
pub mod text;
pub mod verify;
pub mod yaml;
