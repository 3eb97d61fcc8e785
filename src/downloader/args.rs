use crate::jobs::MediaFormat;
use std::ffi::OsString;
use std::path::Path;

/// Format selection for combined video: mp4 video + m4a audio, else the best single mp4, else anything
pub const VIDEO_FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Arguments that make the tool print one progress line per update
const COMMON_ARGS: &[&str] = &["--no-warnings", "--progress", "--newline"];

/// Audio-only extraction to mp3 at the best quality
const AUDIO_ARGS: &[&str] = &["-x", "--audio-format", "mp3", "--audio-quality", "0"];

/// Build the full argument list for one download
///
/// Layout: common flags, format selection, `extra`, `-o <output>`, `--`, `<url>`.
/// The `--` keeps a URL from ever being read as an option.
pub fn build_args(format: MediaFormat, extra: &[String], output: &Path, url: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = COMMON_ARGS.iter().map(OsString::from).collect();

    match format {
        MediaFormat::Audio => args.extend(AUDIO_ARGS.iter().map(OsString::from)),
        MediaFormat::Video => {
            args.push("-f".into());
            args.push(VIDEO_FORMAT_SELECTOR.into());
        }
    }

    args.extend(extra.iter().map(OsString::from));
    args.push("-o".into());
    args.push(output.as_os_str().to_owned());
    args.push("--".into());
    args.push(url.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn audio_selects_extraction() {
        let args = strings(&build_args(
            MediaFormat::Audio,
            &[],
            Path::new("downloads/a.mp3"),
            "https://example.com/v",
        ));

        assert_eq!(
            args,
            vec![
                "--no-warnings",
                "--progress",
                "--newline",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "-o",
                "downloads/a.mp3",
                "--",
                "https://example.com/v",
            ]
        );
        assert!(!args.iter().any(|a| a == "-f"));
    }

    #[test]
    fn video_selects_combined_streams() {
        let args = strings(&build_args(
            MediaFormat::Video,
            &[],
            Path::new("downloads/v.mp4"),
            "https://example.com/v",
        ));

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], VIDEO_FORMAT_SELECTOR);
        assert!(!args.iter().any(|a| a == "-x"));
        assert_eq!(args[args.len() - 4..], ["-o", "downloads/v.mp4", "--", "https://example.com/v"]);
    }

    #[test]
    fn extra_args_precede_output() {
        let extra = vec!["--cookies".to_string(), "c.txt".to_string()];
        let args = strings(&build_args(
            MediaFormat::Audio,
            &extra,
            Path::new("o.mp3"),
            "https://example.com/v",
        ));

        let cookies = args.iter().position(|a| a == "--cookies").unwrap();
        let output = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[cookies + 1], "c.txt");
        assert!(cookies < output);
    }
}
