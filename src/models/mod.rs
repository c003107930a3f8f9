pub mod contact;
pub mod media;
