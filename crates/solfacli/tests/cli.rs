use assert_cmd::Command;
use predicates::prelude::*;

fn write_tune(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("tune.abc");
    std::fs::write(&path, "X:1\nT:Test\nL:1/4\nK:C\ncdec|cdec|efg2|\n").unwrap();
    path
}

#[test]
fn abc_in_musicxml_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_tune(dir.path());
    let output = dir.path().join("out.musicxml");

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("detected key: C major"));

    let xml = std::fs::read_to_string(&output).unwrap();
    assert!(xml.contains("<score-partwise"));
    assert!(xml.contains("<part id=\"P2\">"));
    assert!(xml.contains("<text>do</text>"));
}

#[test]
fn abc_format_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_tune(dir.path());
    let output = dir.path().join("out.abc");

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--format")
        .arg("abc")
        .assert()
        .success();

    let abc = std::fs::read_to_string(&output).unwrap();
    assert!(abc.starts_with("X:1\n"));
    assert!(abc.contains("Q:1/4=90"));
    assert!(abc.contains("w: do"));
}

#[test]
fn json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_tune(dir.path());
    let output = dir.path().join("out.musicxml");

    let assert = Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["notes"], 11);
    assert_eq!(summary["measures"], 3);
    assert_eq!(summary["tempo_bpm"], 90);
    assert_eq!(summary["detected_key"], "C major");
}

#[test]
fn midi_input_reports_source_tempo() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tune.mid");
    let output = dir.path().join("out.musicxml");

    // Single-track SMF at 100 BPM (600000 us per quarter): C D E C
    let mut midi: Vec<u8> = Vec::new();
    midi.extend(b"MThd");
    midi.extend(6u32.to_be_bytes());
    midi.extend(0u16.to_be_bytes());
    midi.extend(1u16.to_be_bytes());
    midi.extend(480u16.to_be_bytes());
    let mut track: Vec<u8> = vec![0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0];
    for pitch in [60u8, 62, 64, 60] {
        track.extend([0x00, 0x90, pitch, 100]);
        track.extend([0x83, 0x60, 0x80, pitch, 0]);
    }
    track.extend([0x00, 0xFF, 0x2F, 0x00]);
    midi.extend(b"MTrk");
    midi.extend((track.len() as u32).to_be_bytes());
    midi.extend(&track);
    std::fs::write(&input, &midi).unwrap();

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("source tempo: 100 bpm"));
}

#[test]
fn no_accompaniment_drops_the_second_part() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_tune(dir.path());
    let output = dir.path().join("out.musicxml");

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--no-accompaniment")
        .assert()
        .success();

    let xml = std::fs::read_to_string(&output).unwrap();
    assert!(!xml.contains("<part id=\"P2\">"));
}

#[test]
fn pdf_is_rejected_with_omr_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("score.pdf");
    std::fs::write(&input, b"%PDF-1.4").unwrap();

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("optical music recognition"));
}

#[test]
fn missing_transcriber_is_reported_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tune.wav");

    // Minimal valid 16-bit mono WAV
    let mut wav: Vec<u8> = Vec::new();
    wav.extend(b"RIFF");
    wav.extend((36u32 + 2).to_le_bytes());
    wav.extend(b"WAVEfmt ");
    wav.extend(16u32.to_le_bytes());
    wav.extend(1u16.to_le_bytes());
    wav.extend(1u16.to_le_bytes());
    wav.extend(8000u32.to_le_bytes());
    wav.extend(16000u32.to_le_bytes());
    wav.extend(2u16.to_le_bytes());
    wav.extend(16u16.to_le_bytes());
    wav.extend(b"data");
    wav.extend(2u32.to_le_bytes());
    wav.extend(0i16.to_le_bytes());
    std::fs::write(&input, &wav).unwrap();

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .arg("--transcriber")
        .arg("definitely-not-installed-anywhere")
        .assert()
        .failure()
        .stderr(predicate::str::contains("transcription unavailable"));
}

#[test]
fn unknown_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, b"la la la").unwrap();

    Command::cargo_bin("solfacli")
        .unwrap()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported"));
}
