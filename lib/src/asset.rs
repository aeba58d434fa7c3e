use std::borrow::Cow;

use rust_embed::Embed;

use crate::error::{VrError, VrResult};

pub trait AssetManagerTrait {
    fn read_file(&self, name: &str) -> VrResult<String>;
}

#[derive(Embed)]
#[folder = "asset"]
struct Asset;

pub struct EmbedAssetManager;

impl EmbedAssetManager {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
        }
    }

    fn open(name: &str) -> VrResult<Cow<'static, [u8]>> {
        Asset::get(name).map(|file| file.data).ok_or_else(|| VrError::Asset(String::from(name)))
    }
}

impl AssetManagerTrait for EmbedAssetManager {
    fn read_file(&self, name: &str) -> VrResult<String> {
        let asset = Self::open(name)?;
        String::from_utf8(asset.into_owned()).map_err(|_| VrError::Asset(format!("{} is not UTF-8", name)))
    }
}
