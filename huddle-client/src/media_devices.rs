/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Device enumeration, used as the fallback path when the default camera
//! cannot be opened.

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use crate::transport::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// Lists the devices available to the platform (`enumerateDevices()` in the
/// browser).
#[async_trait]
pub trait DeviceEnumerator: Send + Sync {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, TransportError>;
}

/// A list of devices of one kind with a current selection.
#[derive(Debug, Clone, Default)]
pub struct SelectableDevices {
    devices: Vec<MediaDeviceInfo>,
    selected: Option<String>,
}

impl SelectableDevices {
    fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        Self {
            devices,
            selected: None,
        }
    }

    /// Select a device by id. Returns `false` (and keeps the previous
    /// selection) if the id is not in [`devices()`](Self::devices).
    pub fn select(&mut self, device_id: &str) -> bool {
        if self.devices.iter().any(|d| d.device_id == device_id) {
            self.selected = Some(device_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn devices(&self) -> &[MediaDeviceInfo] {
        &self.devices
    }

    /// The selected device id; the first device is the default selection.
    pub fn selected(&self) -> Option<&str> {
        match &self.selected {
            Some(selected) => Some(selected),
            None => self.devices.first().map(|d| d.device_id.as_str()),
        }
    }
}

/// Audio and video inputs of the local machine, each with a selection.
#[derive(Debug, Clone, Default)]
pub struct MediaDeviceList {
    pub audio_inputs: SelectableDevices,
    pub video_inputs: SelectableDevices,
}

impl MediaDeviceList {
    /// Query the enumerator and split the result by kind.
    pub async fn load(enumerator: &dyn DeviceEnumerator) -> Result<Self, TransportError> {
        let devices = enumerator.enumerate_devices().await?;
        let (audio, rest): (Vec<_>, Vec<_>) = devices
            .into_iter()
            .partition(|d| d.kind == DeviceKind::AudioInput);
        let video: Vec<_> = rest
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .collect();
        debug!(
            "enumerated {} audio input(s), {} video input(s)",
            audio.len(),
            video.len()
        );
        Ok(Self {
            audio_inputs: SelectableDevices::new(audio),
            video_inputs: SelectableDevices::new(video),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<MediaDeviceInfo>);

    #[async_trait]
    impl DeviceEnumerator for Fixed {
        async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, TransportError> {
            Ok(self.0.clone())
        }
    }

    fn device(id: &str, kind: DeviceKind) -> MediaDeviceInfo {
        MediaDeviceInfo {
            device_id: id.to_string(),
            kind,
            label: format!("{id} label"),
        }
    }

    #[tokio::test]
    async fn test_load_splits_by_kind() {
        let enumerator = Fixed(vec![
            device("mic-1", DeviceKind::AudioInput),
            device("speaker", DeviceKind::AudioOutput),
            device("cam-1", DeviceKind::VideoInput),
            device("cam-2", DeviceKind::VideoInput),
        ]);
        let list = MediaDeviceList::load(&enumerator).await.unwrap();
        assert_eq!(list.audio_inputs.devices().len(), 1);
        assert_eq!(list.video_inputs.devices().len(), 2);
        assert_eq!(list.video_inputs.selected(), Some("cam-1"));
    }

    #[test]
    fn test_select_unknown_device_is_ignored() {
        let mut devices = SelectableDevices::new(vec![
            device("cam-1", DeviceKind::VideoInput),
            device("cam-2", DeviceKind::VideoInput),
        ]);
        assert!(devices.select("cam-2"));
        assert!(!devices.select("cam-9"));
        assert_eq!(devices.selected(), Some("cam-2"));
    }

    #[test]
    fn test_empty_list_has_no_selection() {
        assert_eq!(SelectableDevices::default().selected(), None);
    }
}
