use super::*;

mod custom_title_upload;
mod direct_save;
mod folder_setup;
