//! Rotation settings read from the ambconfig configuration

use crate::error::{Error, Result};
use crate::playlist::PlaylistBuilder;
use crate::scheduler::{RetryPolicy, RotationSettings};
use std::time::Duration;

/// Background music settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicSettings {
    pub source: String,
    pub volume: f32,
}

/// Extension trait for ambconfig::Config
pub trait RotationConfigExt {
    /// Rotation timings: crossfade, image dwell and retries.
    fn rotation_settings(&self) -> Result<RotationSettings>;

    fn music_settings(&self) -> Result<MusicSettings>;

    /// Builder loaded with the leading videos and the image catalog.
    fn playlist_builder(&self) -> Result<PlaylistBuilder>;
}

impl RotationConfigExt for ambconfig::Config {
    fn rotation_settings(&self) -> Result<RotationSettings> {
        let max_retries = self.get_max_retries().map_err(config_error)?;
        Ok(RotationSettings {
            crossfade: Duration::from_millis(self.get_crossfade_ms().map_err(config_error)?),
            dwell: Duration::from_millis(self.get_dwell_ms().map_err(config_error)?),
            retry: RetryPolicy {
                max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
                delay: Duration::from_millis(self.get_retry_delay_ms().map_err(config_error)?),
            },
        })
    }

    fn music_settings(&self) -> Result<MusicSettings> {
        Ok(MusicSettings {
            source: self.get_music_source().map_err(config_error)?,
            volume: self.get_music_volume().map_err(config_error)? as f32,
        })
    }

    fn playlist_builder(&self) -> Result<PlaylistBuilder> {
        let leading = self.get_leading_videos().map_err(config_error)?;
        let images = self.get_image_catalog().map_err(config_error)?;
        Ok(PlaylistBuilder::from_sources(leading, images))
    }
}

fn config_error(err: anyhow::Error) -> Error {
    Error::Config(err.to_string())
}
