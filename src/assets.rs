//! Asset manifest, bitmap store and mosaic cache
//!
//! Every visual asset is an uncompressed BMP converted to a mosaic block
//! set on first use. Load failures are masked once with a flat-colored
//! placeholder so the game stays playable; they are logged, never fatal,
//! and not retried.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::mosaic::{Bitmap, BmpError, Fading, MosaicBlock, MosaicParams, mosaic_blocks};

/// Stable asset keys used by the stage builders
pub const DEALER_FACE: &str = "dealer_face";
pub const DEALER_HAND: &str = "dealer_hand";
pub const PLAYER_FACE: &str = "player_face";
pub const PLAYER_HAND: &str = "player_hand";
pub const SHOTGUN: &str = "shotgun";
pub const SHOTGUN_HELD: &str = "shotgun_held";
pub const SHELL_LIVE: &str = "shell_live";
pub const SHELL_BLANK: &str = "shell_blank";
pub const SHELL_CONCEALED: &str = "shell_concealed";
pub const SHELL_LIVE_FIRED: &str = "shell_live_fired";
pub const WOODEN_FLOOR: &str = "wooden_floor";
pub const FIRE_NEAR: &str = "fire_near";
pub const FIRE_FAR: &str = "fire_far";
pub const BANNER_WIN: &str = "banner_win";
pub const BANNER_LOSE: &str = "banner_lose";

/// Asset key to BMP path, fetched relative to the page
pub const MANIFEST: &[(&str, &str)] = &[
    (DEALER_FACE, "assets/Dealer2.bmp"),
    (DEALER_HAND, "assets/OppHands2.bmp"),
    (PLAYER_FACE, "assets/PlayerFace2.bmp"),
    (PLAYER_HAND, "assets/Hands2.bmp"),
    (SHOTGUN, "assets/Shotgun2.bmp"),
    (SHOTGUN_HELD, "assets/ShotgunHands2.bmp"),
    (SHELL_LIVE, "assets/LiveBullet2.bmp"),
    (SHELL_BLANK, "assets/BlankBullet2.bmp"),
    (SHELL_CONCEALED, "assets/UnknownBullet2.bmp"),
    (SHELL_LIVE_FIRED, "assets/BulletliveFired2.bmp"),
    (WOODEN_FLOOR, "assets/WoodenFloor2.bmp"),
    (FIRE_NEAR, "assets/Fire12.bmp"),
    (FIRE_FAR, "assets/Fire42.bmp"),
    (BANNER_WIN, "assets/youwin.bmp"),
    (BANNER_LOSE, "assets/youlose.bmp"),
];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("fetch failed for {0}")]
    Fetch(String),
    #[error("decode failed for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: BmpError,
    },
}

/// Placeholder dimensions and color for failed loads
const PLACEHOLDER_SIZE: u32 = 32;
const PLACEHOLDER_COLOR: [u8; 3] = [120, 60, 120];

/// A flat-colored stand-in bitmap of a reasonable default size
pub fn placeholder_bitmap() -> Bitmap {
    let side = PLACEHOLDER_SIZE;
    let mut data = Vec::with_capacity((side * side * 4) as usize);
    for _ in 0..side * side {
        data.extend_from_slice(&[
            PLACEHOLDER_COLOR[0],
            PLACEHOLDER_COLOR[1],
            PLACEHOLDER_COLOR[2],
            255,
        ]);
    }
    Bitmap {
        width: side,
        height: side,
        data,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MosaicKey {
    asset: &'static str,
    block: u32,
    size_bits: u32,
    brightness_bits: u32,
    fading_bits: Option<[u32; 4]>,
}

impl MosaicKey {
    fn new(asset: &'static str, params: &MosaicParams) -> Self {
        Self {
            asset,
            block: params.block,
            size_bits: params.size_factor.to_bits(),
            brightness_bits: params.brightness.to_bits(),
            fading_bits: params.fading.as_ref().map(|f| {
                [
                    f.x_radius.to_bits(),
                    f.y_radius.to_bits(),
                    f.x_pow.to_bits(),
                    f.y_pow.to_bits(),
                ]
            }),
        }
    }
}

/// Decoded bitmaps plus memoized mosaic block sets
#[derive(Default)]
pub struct AssetStore {
    bitmaps: HashMap<&'static str, Bitmap>,
    mosaics: HashMap<MosaicKey, Rc<Vec<MosaicBlock>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, bitmap: Bitmap) {
        self.bitmaps.insert(key, bitmap);
    }

    pub fn bitmap(&self, key: &str) -> Option<&Bitmap> {
        self.bitmaps.get(key)
    }

    /// Mosaic block set for an asset, computed once per unique parameter
    /// combination. Missing assets fall back to the placeholder.
    pub fn mosaic(&mut self, key: &'static str, params: MosaicParams) -> Rc<Vec<MosaicBlock>> {
        let cache_key = MosaicKey::new(key, &params);
        if let Some(blocks) = self.mosaics.get(&cache_key) {
            return blocks.clone();
        }
        let blocks = match self.bitmaps.get(key) {
            Some(bitmap) => mosaic_blocks(bitmap, &params),
            None => {
                log::warn!("asset '{key}' missing, using placeholder");
                let fallback = placeholder_bitmap();
                self.bitmaps.insert(key, fallback);
                mosaic_blocks(&self.bitmaps[key], &params)
            }
        };
        let blocks = Rc::new(blocks);
        self.mosaics.insert(cache_key, blocks.clone());
        blocks
    }
}

/// Mosaic parameters shared by the stage builders
pub mod params {
    use super::{Fading, MosaicParams};

    /// Faces, hands and the gun sprite
    pub fn sprite() -> MosaicParams {
        MosaicParams::new(4, 1.0)
    }

    pub fn gun() -> MosaicParams {
        MosaicParams::new(4, 1.5)
    }

    pub fn shell_icon() -> MosaicParams {
        MosaicParams::new(4, 0.8)
    }

    pub fn ejected_shell() -> MosaicParams {
        MosaicParams::new(8, 0.5).brightness(0.5)
    }

    pub fn banner() -> MosaicParams {
        MosaicParams::new(1, 20.0)
    }

    pub fn muzzle_flash(size: f32) -> MosaicParams {
        MosaicParams::new(4, size)
    }

    /// Dimmed, vignetted floor backdrop
    pub fn background() -> MosaicParams {
        MosaicParams::new(3, 9.0).fading(Fading {
            x_radius: 0.6,
            y_radius: 1.0,
            x_pow: 0.4,
            y_pow: 0.5,
        })
    }
}

/// Fetch and decode every manifest entry (wasm only). Each failure is
/// replaced by the placeholder and logged.
#[cfg(target_arch = "wasm32")]
pub async fn load_all(store: &mut AssetStore) {
    for &(key, path) in MANIFEST {
        match fetch_bmp(path).await {
            Ok(bitmap) => store.insert(key, bitmap),
            Err(err) => {
                log::warn!("asset load failed ({err}), using placeholder for '{key}'");
                store.insert(key, placeholder_bitmap());
            }
        }
    }
    log::info!("loaded {} assets", MANIFEST.len());
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bmp(path: &str) -> Result<Bitmap, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| AssetError::Fetch(path.to_string()))?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|_| AssetError::Fetch(path.to_string()))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| AssetError::Fetch(path.to_string()))?;
    if !response.ok() {
        return Err(AssetError::Fetch(path.to_string()));
    }
    let buffer = JsFuture::from(
        response
            .array_buffer()
            .map_err(|_| AssetError::Fetch(path.to_string()))?,
    )
    .await
    .map_err(|_| AssetError::Fetch(path.to_string()))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    crate::mosaic::decode_bmp(&bytes).map_err(|source| AssetError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_reasonable() {
        let bmp = placeholder_bitmap();
        assert_eq!(bmp.width, PLACEHOLDER_SIZE);
        assert_eq!(bmp.data.len(), (bmp.width * bmp.height * 4) as usize);
        // not black, so the mosaic transform keeps its tiles
        assert_ne!(&bmp.data[0..3], &[0, 0, 0]);
    }

    #[test]
    fn test_missing_asset_uses_placeholder_once() {
        let mut store = AssetStore::new();
        let blocks = store.mosaic(SHOTGUN, MosaicParams::new(8, 1.0));
        assert!(!blocks.is_empty());
        // the placeholder was installed, not retried
        assert!(store.bitmap(SHOTGUN).is_some());
    }

    #[test]
    fn test_mosaic_cache_returns_shared_blocks() {
        let mut store = AssetStore::new();
        store.insert(SHELL_LIVE, placeholder_bitmap());
        let a = store.mosaic(SHELL_LIVE, MosaicParams::new(4, 0.8));
        let b = store.mosaic(SHELL_LIVE, MosaicParams::new(4, 0.8));
        assert!(Rc::ptr_eq(&a, &b));
        // different parameters are distinct cache entries
        let c = store.mosaic(SHELL_LIVE, MosaicParams::new(2, 0.8));
        assert!(!Rc::ptr_eq(&a, &c));
    }
}
