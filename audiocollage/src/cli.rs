mod duration;

use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

pub use self::duration::parse_clip_length;

pub const DEFAULT_OUTPUT: &str = "out.wav";

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .about("Build one audio file from random clips of a directory of recordings")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Directory scanned recursively for source audio")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("Output WAV file (44.1 kHz, stereo, 16 bit)")
                .default_value(DEFAULT_OUTPUT)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .value_name("SECONDS")
                .help("Length of each clip in seconds, or with a unit (e.g. 500ms, 1m30s)")
                .default_value("1")
                .value_parser(ValueParser::new(parse_clip_length)),
        )
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .value_name("N")
                .help("Number of clips to generate")
                .default_value("10")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .help("Seed for clip selection; the same seed and corpus give the same output")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the clips that would be drawn without writing any output")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn defaults_apply_without_arguments() {
        let matches = build_cli().try_get_matches_from(["audiocollage"]).unwrap();

        assert_eq!(
            matches.get_one::<PathBuf>("dir"),
            Some(&PathBuf::from("."))
        );
        assert_eq!(
            matches.get_one::<PathBuf>("out"),
            Some(&PathBuf::from(DEFAULT_OUTPUT))
        );
        assert_eq!(
            matches.get_one::<Duration>("length"),
            Some(&Duration::from_secs(1))
        );
        assert_eq!(matches.get_one::<usize>("count"), Some(&10));
        assert_eq!(matches.get_one::<u64>("seed"), None);
        assert!(!matches.get_flag("dry-run"));
    }

    #[test]
    fn length_accepts_units() {
        let matches = build_cli()
            .try_get_matches_from(["audiocollage", "--length", "250ms"])
            .unwrap();
        assert_eq!(
            matches.get_one::<Duration>("length"),
            Some(&Duration::from_millis(250))
        );
    }

    #[test]
    fn rejects_zero_length() {
        assert!(build_cli()
            .try_get_matches_from(["audiocollage", "--length", "0"])
            .is_err());
    }
}
