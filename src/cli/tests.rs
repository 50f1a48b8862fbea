use crate::cli::{CliApp, Commands, EntryRef, ParseError};
use crate::models::{InsertPosition, RepeatMode};
use clap::Parser;
use std::time::Duration;

#[test]
fn test_parse_command_basic_controls() {
    assert_eq!(CliApp::parse_command("pause").unwrap(), Commands::Pause);
    assert_eq!(CliApp::parse_command("resume").unwrap(), Commands::Resume);
    assert_eq!(CliApp::parse_command("next").unwrap(), Commands::Next);
    assert_eq!(CliApp::parse_command("prev").unwrap(), Commands::Prev);
    assert_eq!(CliApp::parse_command("previous").unwrap(), Commands::Prev);
    assert_eq!(CliApp::parse_command("ended").unwrap(), Commands::Ended);
    assert_eq!(CliApp::parse_command("status").unwrap(), Commands::Status);
    assert_eq!(CliApp::parse_command("  LIST  ").unwrap(), Commands::List);
    assert_eq!(CliApp::parse_command("dedupe").unwrap(), Commands::Dedupe);
    assert_eq!(CliApp::parse_command("clear").unwrap(), Commands::Clear);
}

#[test]
fn test_parse_command_add() {
    let command = CliApp::parse_command("add 42 Blue in Green").unwrap();
    match &command {
        Commands::Add { id, title, next, end, .. } => {
            assert_eq!(id, "42");
            assert_eq!(title, "Blue in Green");
            assert!(!next);
            assert!(!end);
        }
        other => panic!("Expected Add command, got {:?}", other),
    }
    assert_eq!(command.insert_position(), None);

    let track = command.track_to_add().unwrap();
    assert_eq!(track.id, "42");
    assert_eq!(track.display_title(), "Blue in Green");
    assert!(track.artist.is_none());
}

#[test]
fn test_parse_command_add_with_flags() {
    let command = CliApp::parse_command(
        r#"add --next --artist "Miles Davis" --album "Kind of Blue" --duration 5:37 7 So What"#,
    )
    .unwrap();

    assert_eq!(command.insert_position(), Some(InsertPosition::Next));
    let track = command.track_to_add().unwrap();
    assert_eq!(track.id, "7");
    assert_eq!(track.display_title(), "So What");
    assert_eq!(track.artist.as_deref(), Some("Miles Davis"));
    assert_eq!(track.album.as_deref(), Some("Kind of Blue"));
    assert_eq!(track.duration_ms, Some(337_000));

    let command = CliApp::parse_command("add --end --duration-ms 1500 9 Short").unwrap();
    assert_eq!(command.insert_position(), Some(InsertPosition::End));
    assert_eq!(command.track_to_add().unwrap().duration_ms, Some(1_500));
}

#[test]
fn test_parse_command_add_errors() {
    assert!(matches!(
        CliApp::parse_command("add"),
        Err(ParseError::MissingArgument { argument, .. }) if argument == "id"
    ));
    assert!(matches!(
        CliApp::parse_command("add 42"),
        Err(ParseError::MissingArgument { argument, .. }) if argument == "title"
    ));
    assert!(matches!(
        CliApp::parse_command("add --artist"),
        Err(ParseError::MissingArgument { argument, .. }) if argument == "--artist"
    ));
    assert!(matches!(
        CliApp::parse_command("add --next --end 1 x"),
        Err(ParseError::InvalidArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("add --duration-ms soon 1 x"),
        Err(ParseError::InvalidArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("add --loud 1 x"),
        Err(ParseError::UnknownCommand { .. })
    ));
}

#[test]
fn test_parse_command_entry_references() {
    assert_eq!(
        CliApp::parse_command("remove 3").unwrap(),
        Commands::Remove { entry: EntryRef::Row(3) }
    );
    assert_eq!(
        CliApp::parse_command("rm 3f2a9c").unwrap(),
        Commands::Remove { entry: EntryRef::Id("3f2a9c".to_string()) }
    );
    assert_eq!(
        CliApp::parse_command("top AB12CD34").unwrap(),
        Commands::Top { entry: EntryRef::Id("ab12cd34".to_string()) }
    );
    assert!(matches!(
        CliApp::parse_command("remove 0"),
        Err(ParseError::InvalidArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("top"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_move_and_play() {
    assert_eq!(
        CliApp::parse_command("move 1 4").unwrap(),
        Commands::Move { from: 1, to: 4 }
    );
    assert!(matches!(
        CliApp::parse_command("move 1"),
        Err(ParseError::MissingArgument { argument, .. }) if argument == "to"
    ));
    assert!(matches!(
        CliApp::parse_command("move 0 2"),
        Err(ParseError::InvalidArgument { .. })
    ));

    assert_eq!(CliApp::parse_command("play").unwrap(), Commands::Play { row: None });
    assert_eq!(CliApp::parse_command("play 2").unwrap(), Commands::Play { row: Some(2) });
    assert!(CliApp::parse_command("play two").is_err());
}

#[test]
fn test_parse_command_seek() {
    assert_eq!(
        CliApp::parse_command("seek 1:30").unwrap(),
        Commands::Seek { position: "1:30".to_string() }
    );
    assert!(matches!(
        CliApp::parse_command("seek"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_volume() {
    assert_eq!(CliApp::parse_command("volume 0").unwrap(), Commands::Volume { level: 0 });
    assert_eq!(CliApp::parse_command("vol 100").unwrap(), Commands::Volume { level: 100 });

    match CliApp::parse_command("volume 150") {
        Err(ParseError::InvalidArgument { expected, .. }) => assert_eq!(expected, "0-100"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
    match CliApp::parse_command("volume loud") {
        Err(ParseError::InvalidArgument { expected, .. }) => assert_eq!(expected, "number 0-100"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
    assert!(matches!(
        CliApp::parse_command("volume"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_modes() {
    assert_eq!(CliApp::parse_command("repeat").unwrap(), Commands::Repeat { mode: None });
    assert_eq!(
        CliApp::parse_command("repeat one").unwrap(),
        Commands::Repeat { mode: Some(RepeatMode::One) }
    );
    assert!(CliApp::parse_command("repeat twice").is_err());

    assert_eq!(CliApp::parse_command("shuffle").unwrap(), Commands::Shuffle { enabled: None });
    assert_eq!(
        CliApp::parse_command("shuffle on").unwrap(),
        Commands::Shuffle { enabled: Some(true) }
    );
    assert_eq!(
        CliApp::parse_command("shuffle OFF").unwrap(),
        Commands::Shuffle { enabled: Some(false) }
    );
    assert!(CliApp::parse_command("shuffle maybe").is_err());
}

#[test]
fn test_parse_command_errors() {
    assert!(matches!(CliApp::parse_command(""), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("   "), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("help"), Err(ParseError::HelpRequested)));
    assert!(matches!(
        CliApp::parse_command("dance"),
        Err(ParseError::UnknownCommand { command }) if command == "dance"
    ));
    assert!(matches!(
        CliApp::parse_command(r#"add 1 "unclosed"#),
        Err(ParseError::UnterminatedQuote { .. })
    ));
}

#[test]
fn test_split_args() {
    assert_eq!(
        CliApp::split_args(r#"add "two words" plain"#).unwrap(),
        vec!["add", "two words", "plain"]
    );
    assert_eq!(CliApp::split_args(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
    assert!(CliApp::split_args("   ").unwrap().is_empty());
}

#[test]
fn test_parse_time() {
    assert_eq!(CliApp::parse_time("90").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("90s").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("1:30").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("0:00").unwrap(), Duration::ZERO);
    assert_eq!(CliApp::parse_time("1:30.5").unwrap(), Duration::from_millis(90_500));
    assert_eq!(CliApp::parse_time(" 45 ").unwrap(), Duration::from_secs(45));

    for bad in ["", "abc", "1:60", "1:2:3", "-5", ":30", "1:", "inf"] {
        assert!(
            matches!(CliApp::parse_time(bad), Err(ParseError::InvalidTimeFormat { .. })),
            "'{}' should be rejected",
            bad
        );
    }
}

#[test]
fn test_validate_seek_time() {
    let duration = Some(Duration::from_secs(120));
    assert_eq!(
        CliApp::validate_seek_time(Duration::from_secs(60), duration).unwrap(),
        Duration::from_secs(60)
    );
    assert!(CliApp::validate_seek_time(Duration::from_secs(120), duration).is_ok());
    assert!(matches!(
        CliApp::validate_seek_time(Duration::from_secs(121), duration),
        Err(ParseError::SeekBeyondDuration { .. })
    ));
    assert!(CliApp::validate_seek_time(Duration::from_secs(9_999), None).is_ok());
}

#[test]
fn test_parse_error_display() {
    let err = ParseError::MissingArgument {
        command: "seek".to_string(),
        argument: "position".to_string(),
    };
    assert_eq!(err.to_string(), "Missing argument for seek: position");

    let err = ParseError::SeekBeyondDuration {
        position: 130.0,
        duration: 120.0,
    };
    assert_eq!(err.to_string(), "Seek position 130.00s exceeds track duration 120.00s");
}

#[test]
fn test_clap_single_command_mode() {
    let app = CliApp::try_parse_from([
        "qplay", "--data-dir", "/tmp/q", "add", "--next", "--artist", "Nina", "5", "Feeling Good",
    ])
    .unwrap();
    assert_eq!(app.data_dir.as_deref(), Some(std::path::Path::new("/tmp/q")));

    let command = app.command.unwrap();
    assert_eq!(command.insert_position(), Some(InsertPosition::Next));
    assert_eq!(command.track_to_add().unwrap().artist.as_deref(), Some("Nina"));

    let app = CliApp::try_parse_from(["qplay", "repeat", "all"]).unwrap();
    assert_eq!(app.command, Some(Commands::Repeat { mode: Some(RepeatMode::All) }));

    let app = CliApp::try_parse_from(["qplay", "shuffle", "off"]).unwrap();
    assert_eq!(app.command, Some(Commands::Shuffle { enabled: Some(false) }));

    let app = CliApp::try_parse_from(["qplay", "remove", "2"]).unwrap();
    assert_eq!(app.command, Some(Commands::Remove { entry: EntryRef::Row(2) }));

    let app = CliApp::try_parse_from(["qplay"]).unwrap();
    assert!(app.command.is_none());

    assert!(CliApp::try_parse_from(["qplay", "add", "--next", "--end", "1", "x"]).is_err());
}

#[test]
fn test_read_only_commands() {
    assert!(Commands::List.is_read_only());
    assert!(Commands::Status.is_read_only());
    assert!(!Commands::Next.is_read_only());
    assert!(!Commands::Dedupe.is_read_only());
}
