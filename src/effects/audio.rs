//! Audio collaborator
//!
//! The story only names tracks and asks for them to play; actual media
//! playback belongs to the host. `AudioLibrary` keeps the bookkeeping so a
//! headless host (or a test) can observe what was requested.

use serde::Serialize;

pub trait AudioPlayer {
    /// Register a track under `name`
    fn add(&mut self, url: &str, name: &str);
    /// Start a registered track; `false` when no track has that name
    fn play_audio(&mut self, name: &str, looped: bool, volume: f64) -> bool;
    fn pause_audio(&mut self, name: &str);
    fn toggle_mute_all(&mut self);
    fn stop_all(&mut self);
}

/// Bookkeeping for one registered track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    pub url: String,
    pub looped: bool,
    pub volume: f64,
    pub muted: bool,
    pub playing: bool,
    /// Position reset requested by `stop_all`
    pub rewound: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioLibrary {
    tracks: Vec<Track>,
    master_volume: f64,
}

impl Default for AudioLibrary {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            master_volume: 1.0,
        }
    }
}

impl AudioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_master_volume(master_volume: f64) -> Self {
        Self {
            master_volume,
            ..Self::default()
        }
    }

    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn playing(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.playing)
    }

    fn track_mut(&mut self, name: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.name == name)
    }
}

impl AudioPlayer for AudioLibrary {
    fn add(&mut self, url: &str, name: &str) {
        if let Some(existing) = self.track_mut(name) {
            log::warn!("audio track {name} registered twice; replacing its url");
            existing.url = url.to_string();
            return;
        }
        self.tracks.push(Track {
            name: name.to_string(),
            url: url.to_string(),
            looped: false,
            volume: 1.0,
            muted: false,
            playing: false,
            rewound: false,
        });
    }

    fn play_audio(&mut self, name: &str, looped: bool, volume: f64) -> bool {
        let master = self.master_volume;
        match self.track_mut(name) {
            Some(track) => {
                track.looped = looped;
                track.volume = volume * master;
                track.playing = true;
                track.rewound = false;
                log::debug!("playing {name} (loop {looped}, volume {})", track.volume);
                true
            }
            None => false,
        }
    }

    fn pause_audio(&mut self, name: &str) {
        if let Some(track) = self.track_mut(name) {
            track.playing = false;
        }
    }

    fn toggle_mute_all(&mut self) {
        for track in &mut self.tracks {
            track.muted = !track.muted;
        }
    }

    fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.playing = false;
            track.rewound = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_requires_registration() {
        let mut audio = AudioLibrary::new();
        assert!(!audio.play_audio("drip", false, 1.0));

        audio.add("sfx/drip.ogg", "drip");
        assert!(audio.play_audio("drip", true, 0.5));
        let track = audio.track("drip").unwrap();
        assert!(track.playing);
        assert!(track.looped);
        assert_eq!(track.volume, 0.5);
    }

    #[test]
    fn master_volume_scales_playback() {
        let mut audio = AudioLibrary::with_master_volume(0.5);
        audio.add("a.ogg", "a");
        audio.play_audio("a", false, 0.8);
        assert_eq!(audio.track("a").unwrap().volume, 0.4);
    }

    #[test]
    fn stop_and_mute_apply_to_every_track() {
        let mut audio = AudioLibrary::new();
        audio.add("a.ogg", "a");
        audio.add("b.ogg", "b");
        audio.play_audio("a", false, 1.0);
        audio.play_audio("b", false, 1.0);

        audio.toggle_mute_all();
        assert!(audio.tracks().iter().all(|t| t.muted));

        audio.pause_audio("a");
        assert_eq!(audio.playing().count(), 1);

        audio.stop_all();
        assert_eq!(audio.playing().count(), 0);
        assert!(audio.tracks().iter().all(|t| t.rewound));
    }
}
