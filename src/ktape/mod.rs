//! Karaoke-tape conversion: the game's `.ktape.ckd` JSON and a
//! line-oriented `key=value` text form that is sane to hand-edit.
//!
//! Shares no code or data with the archive codec — this is the sidecar
//! tool for lyric timing tables.  The game's JSON carries a trailing
//! NUL byte; its presence is how [`bake`]/[`unbake`] callers tell the
//! two representations apart.
//!
//! Text form of a tape:
//!
//! ```text
//! __class=Tape
//! Clips=2
//! ; Clips[index]=__class,Id,TrackId,IsActive,StartTime,Duration,...
//! Clips[0]=KaraokeClip,4242,0,1,480,240,4.5,Never,0,1,0,0,0
//! Clips[1]=...
//! TapeClock=0
//! ...
//! EOF
//! ```
//!
//! Lines starting with `;` are comments.  U+00A0 in string values is
//! folded to a plain space on parse so editors that insert it don't
//! corrupt class names or lyrics.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KtapeError {
    #[error("Clip record has {0} fields, expected 13")]
    ShortClipRecord(usize),
    #[error("Clip index {index} out of range, Clips={len}")]
    ClipIndexOutOfRange { index: usize, len: usize },
    #[error("Lyric line '{0}' contains invalid characters")]
    InvalidLyrics(String),
    #[error("Invalid integer: {0}")]
    BadInt(#[from] std::num::ParseIntError),
    #[error("Invalid number: {0}")]
    BadFloat(#[from] std::num::ParseFloatError),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One timed lyric fragment.  Field names mirror the game's JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KaraokeClip {
    #[serde(rename = "__class")]
    pub class: String,
    pub id: u32,
    pub track_id: i32,
    pub is_active: i32,
    pub start_time: i32,
    pub duration: i32,
    pub pitch: f64,
    pub lyrics: String,
    pub is_end_of_line: i32,
    pub content_type: i32,
    pub start_time_tolerance: i32,
    pub end_time_tolerance: i32,
    pub semitone_tolerance: i32,
}

impl KaraokeClip {
    /// Parse one `Clips[i]=` CSV record.  Extra trailing fields are
    /// ignored, matching the original tool.
    fn from_record(value: &str) -> Result<Self, KtapeError> {
        let items: Vec<&str> = value.split(',').collect();
        if items.len() < 13 {
            return Err(KtapeError::ShortClipRecord(items.len()));
        }
        Ok(Self {
            class: fold_nbsp(items[0]),
            id: items[1].parse()?,
            track_id: items[2].parse()?,
            is_active: items[3].parse()?,
            start_time: items[4].parse()?,
            duration: items[5].parse()?,
            pitch: items[6].parse()?,
            lyrics: fold_nbsp(items[7]),
            is_end_of_line: items[8].parse()?,
            content_type: items[9].parse()?,
            start_time_tolerance: items[10].parse()?,
            end_time_tolerance: items[11].parse()?,
            semitone_tolerance: items[12].parse()?,
        })
    }

    fn to_record(&self, out: &mut String) -> Result<(), KtapeError> {
        // Commas and '=' are the format's structure; a lyric carrying
        // them cannot be represented.
        if self.lyrics.contains(',') || self.lyrics.contains('=') || self.lyrics.contains('\n') {
            return Err(KtapeError::InvalidLyrics(self.lyrics.clone()));
        }
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.class,
            self.id,
            self.track_id,
            self.is_active,
            self.start_time,
            self.duration,
            self.pitch,
            self.lyrics,
            self.is_end_of_line,
            self.content_type,
            self.start_time_tolerance,
            self.end_time_tolerance,
            self.semitone_tolerance,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tape {
    #[serde(rename = "__class")]
    pub class: String,
    pub clips: Vec<KaraokeClip>,
    pub tape_clock: i32,
    pub tape_bar_count: i32,
    pub free_resources_after_play: i32,
    pub map_name: String,
    pub soundwich_event: String,
}

impl Tape {
    /// The game tolerates (and benefits from) clips sorted by start
    /// time, which also makes the text form diffable.
    pub fn sort_clips_by_start_time(&mut self) {
        self.clips.sort_by_key(|c| c.start_time);
    }

    pub fn from_nik(text: &str) -> Result<Self, KtapeError> {
        let mut tape = Tape::default();

        for line in text.lines() {
            if line.starts_with(';') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };

            match name {
                "__class" => tape.class = fold_nbsp(value),
                "Clips" => {
                    tape.clips = vec![KaraokeClip::default(); value.parse::<u32>()? as usize]
                }
                "TapeClock" => tape.tape_clock = value.parse()?,
                "TapeBarCount" => tape.tape_bar_count = value.parse()?,
                "FreeResourcesAfterPlay" => tape.free_resources_after_play = value.parse()?,
                "MapName" => tape.map_name = fold_nbsp(value),
                "SoundwichEvent" => tape.soundwich_event = fold_nbsp(value),
                other => {
                    // Indexed keys: only Clips[i] is known.  "EOF" and
                    // anything else without brackets is skipped.
                    let (Some(open), Some(close)) = (other.find('['), other.find(']')) else {
                        continue;
                    };
                    if &other[..open] != "Clips" {
                        continue;
                    }
                    let index: usize = other[open + 1..close].parse()?;
                    let len = tape.clips.len();
                    let slot = tape.clips.get_mut(index).ok_or_else(|| {
                        KtapeError::ClipIndexOutOfRange { index, len }
                    })?;
                    *slot = KaraokeClip::from_record(value)?;
                }
            }
        }

        Ok(tape)
    }

    pub fn to_nik(&self) -> Result<String, KtapeError> {
        let mut out = String::new();
        let _ = writeln!(out, "__class={}", self.class);
        let _ = writeln!(out, "Clips={}", self.clips.len());
        let _ = writeln!(
            out,
            "; Clips[index]=__class,Id,TrackId,IsActive,StartTime,Duration,Pitch,Lyrics,\
             IsEndOfLine,ContentType,StartTimeTolerance,EndTimeTolerance,SemitoneTolerance"
        );
        for (i, clip) in self.clips.iter().enumerate() {
            let _ = write!(out, "Clips[{i}]=");
            clip.to_record(&mut out)?;
        }
        let _ = writeln!(out, "TapeClock={}", self.tape_clock);
        let _ = writeln!(out, "TapeBarCount={}", self.tape_bar_count);
        let _ = writeln!(out, "FreeResourcesAfterPlay={}", self.free_resources_after_play);
        let _ = writeln!(out, "MapName={}", self.map_name);
        let _ = writeln!(out, "SoundwichEvent={}", self.soundwich_event);
        let _ = writeln!(out, "EOF");
        Ok(out)
    }
}

/// Decode game JSON bytes (trailing NUL included) into the text form,
/// sorting clips by start time on the way.
pub fn unbake(raw: &[u8]) -> Result<String, KtapeError> {
    let json = match raw.last() {
        Some(0) => &raw[..raw.len() - 1],
        _ => raw,
    };
    let mut tape: Tape = serde_json::from_slice(json)?;
    tape.sort_clips_by_start_time();
    tape.to_nik()
}

/// Encode the text form back into game JSON bytes.  The game's own
/// JSON files all end with a NUL byte, so one is appended.
pub fn bake(text: &str) -> Result<Vec<u8>, KtapeError> {
    let tape = Tape::from_nik(text)?;
    let mut out = serde_json::to_vec(&tape)?;
    out.push(0);
    Ok(out)
}

/// True iff `raw` looks like game JSON rather than the text form.
pub fn is_baked(raw: &[u8]) -> bool {
    raw.last() == Some(&0)
}

fn fold_nbsp(s: &str) -> String {
    s.replace('\u{00A0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tape {
        Tape {
            class: "Tape".into(),
            clips: vec![
                KaraokeClip {
                    class: "KaraokeClip".into(),
                    id: 2,
                    track_id: 0,
                    is_active: 1,
                    start_time: 960,
                    duration: 240,
                    pitch: 2.5,
                    lyrics: "gonna".into(),
                    is_end_of_line: 0,
                    content_type: 1,
                    ..Default::default()
                },
                KaraokeClip {
                    class: "KaraokeClip".into(),
                    id: 1,
                    start_time: 480,
                    duration: 240,
                    pitch: 0.0,
                    lyrics: "Never".into(),
                    is_end_of_line: 1,
                    ..Default::default()
                },
            ],
            tape_clock: 0,
            tape_bar_count: 95,
            free_resources_after_play: 0,
            map_name: "NeverGonna".into(),
            soundwich_event: "".into(),
        }
    }

    #[test]
    fn nik_roundtrip() {
        let tape = sample();
        let text = tape.to_nik().unwrap();
        let back = Tape::from_nik(&text).unwrap();
        assert_eq!(back, tape);
    }

    #[test]
    fn bake_unbake_roundtrip_sorts_clips() {
        let json = serde_json::to_vec(&sample()).unwrap();
        let mut baked = json.clone();
        baked.push(0);

        let text = unbake(&baked).unwrap();
        let reparsed = Tape::from_nik(&text).unwrap();
        // unbake sorts by start time; the sample is deliberately out of order.
        assert_eq!(reparsed.clips[0].lyrics, "Never");
        assert_eq!(reparsed.clips[1].lyrics, "gonna");

        let rebaked = bake(&text).unwrap();
        assert_eq!(rebaked.last(), Some(&0));
        let tape: Tape = serde_json::from_slice(&rebaked[..rebaked.len() - 1]).unwrap();
        assert_eq!(tape.clips.len(), 2);
    }

    #[test]
    fn json_field_names_match_the_game() {
        let json = serde_json::to_string(&sample()).unwrap();
        for key in ["\"__class\"", "\"Clips\"", "\"TapeClock\"", "\"TrackId\"", "\"Lyrics\""] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn comments_and_eof_are_ignored() {
        let text = "; a comment\n__class=Tape\nClips=0\nEOF\n";
        let tape = Tape::from_nik(text).unwrap();
        assert_eq!(tape.class, "Tape");
        assert!(tape.clips.is_empty());
    }

    #[test]
    fn nbsp_is_folded_to_space() {
        let text = "__class=Tape\nClips=1\nClips[0]=KaraokeClip,1,0,1,0,10,0,Never\u{00A0}gonna,0,1,0,0,0\n";
        let tape = Tape::from_nik(text).unwrap();
        assert_eq!(tape.clips[0].lyrics, "Never gonna");
    }

    #[test]
    fn lyrics_with_separators_cannot_be_written() {
        let mut tape = sample();
        tape.clips[0].lyrics = "a,b".into();
        assert!(matches!(tape.to_nik(), Err(KtapeError::InvalidLyrics(_))));
    }

    #[test]
    fn clip_index_out_of_range_is_an_error() {
        let text = "Clips=1\nClips[3]=KaraokeClip,1,0,1,0,10,0,x,0,1,0,0,0\n";
        assert!(matches!(
            Tape::from_nik(text),
            Err(KtapeError::ClipIndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn short_clip_record_is_an_error() {
        let text = "Clips=1\nClips[0]=KaraokeClip,1,0\n";
        assert!(matches!(
            Tape::from_nik(text),
            Err(KtapeError::ShortClipRecord(3))
        ));
    }
}
