use anyhow::Result;
use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

fn get_resource_path(resource_name: &str) -> PathBuf {
    PathBuf::from(format!("tests/resources/{resource_name}"))
}

/// Temp dir holding a copy of the two-channel board.
fn sandbox() -> Result<(TempDir, PathBuf)> {
    let temp = TempDir::new()?;
    temp.copy_from(get_resource_path("laser_drivers"), &["*.kicad_pcb"])?;
    let board = temp.path().join("board.kicad_pcb");
    Ok((temp, board))
}

fn renet(args: &[&str]) -> Result<Command> {
    let mut cmd = Command::cargo_bin("renet")?;
    cmd.env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("RUST_LOG")
        .args(args);
    Ok(cmd)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

fn stderr_of_failure(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().code(1).get_output().stderr.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn apply_renumbers_both_channels_in_place() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let original = std::fs::read_to_string(&board)?;

    let stdout = stdout_of(&mut renet(&["apply", path_arg(&board)])?);
    assert!(stdout.contains("Channel A (Q37) net number 37"), "{stdout}");
    assert!(stdout.contains("Channel B (Q12) net number 12"), "{stdout}");
    assert!(stdout.contains("LD37 pad 2: /LD_1_K -> /LD_37_K"), "{stdout}");
    assert!(stdout.contains("R21 pad 2: Net-(Q2-G) -> Net-(Q12-G)"), "{stdout}");
    assert!(stdout.contains("2 groups, 12 pads renamed, 6 nets created"), "{stdout}");

    let updated = std::fs::read_to_string(&board)?;
    assert_ne!(original, updated);
    assert!(updated.contains(concat!(
        "\t(net 8 \"Net-(Q2-G)\")\n",
        "\t(net 9 \"/LD_37_K\")\n",
        "\t(net 10 \"Net-(Q37-G)\")\n",
        "\t(net 11 \"/EN37\")\n",
        "\t(net 12 \"/LD_12_K\")\n",
        "\t(net 13 \"/EN12\")\n",
        "\t(net 14 \"Net-(Q12-G)\")\n",
        "\t(footprint",
    )));
    // Old declarations stay; pads move over
    assert_eq!(updated.matches("(net 3 \"/LD_1_K\")").count(), 1);
    assert_eq!(updated.matches("(net 9 \"/LD_37_K\")").count(), 3);
    assert_eq!(updated.matches("(net 10 \"Net-(Q37-G)\")").count(), 4);
    assert_eq!(updated.matches("(net 1 \"GND\")").count(), 5);
    // Tracks keep their net code
    assert!(updated.contains("\t\t(net 3)\n"));
    Ok(())
}

#[test]
fn second_apply_is_a_no_op() -> Result<()> {
    let (_temp, board) = sandbox()?;
    renet(&["apply", path_arg(&board)])?.assert().success();
    let first = std::fs::read_to_string(&board)?;

    let stdout = stdout_of(&mut renet(&["apply", path_arg(&board)])?);
    assert!(stdout.contains("2 groups, 0 pads renamed, 0 nets created"), "{stdout}");
    assert!(stdout.contains("Board already up to date"), "{stdout}");
    assert_eq!(first, std::fs::read_to_string(&board)?);
    Ok(())
}

#[test]
fn dry_run_prints_diff_and_leaves_file_alone() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let original = std::fs::read_to_string(&board)?;

    let stdout = stdout_of(&mut renet(&["apply", "--dry-run", path_arg(&board)])?);
    assert!(stdout.contains("--- old/"), "{stdout}");
    assert!(stdout.contains("+++ new/"), "{stdout}");
    assert!(stdout.contains("+\t(net 9 \"/LD_37_K\")"), "{stdout}");
    assert!(stdout.contains("-\t\t\t(net 3 \"/LD_1_K\")"), "{stdout}");
    assert!(stdout.contains("+\t\t\t(net 9 \"/LD_37_K\")"), "{stdout}");

    assert_eq!(original, std::fs::read_to_string(&board)?);
    Ok(())
}

#[test]
fn output_flag_writes_elsewhere() -> Result<()> {
    let (temp, board) = sandbox()?;
    let original = std::fs::read_to_string(&board)?;
    let out = temp.child("renumbered.kicad_pcb");

    renet(&["apply", path_arg(&board), "-o", path_arg(out.path())])?
        .assert()
        .success();

    assert_eq!(original, std::fs::read_to_string(&board)?);
    let written = std::fs::read_to_string(out.path())?;
    assert!(written.contains("(net 14 \"Net-(Q12-G)\")"));
    Ok(())
}

#[test]
fn group_filter_only_touches_named_group() -> Result<()> {
    let (_temp, board) = sandbox()?;

    let stdout = stdout_of(&mut renet(&["apply", path_arg(&board), "--group", "Channel B"])?);
    assert!(!stdout.contains("Channel A"), "{stdout}");
    assert!(stdout.contains("1 groups, 6 pads renamed, 3 nets created"), "{stdout}");

    let updated = std::fs::read_to_string(&board)?;
    assert!(updated.contains("\t(net 9 \"/LD_12_K\")"));
    assert!(!updated.contains("LD_37_K"));
    Ok(())
}

#[test]
fn unknown_group_is_an_error() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let stderr = stderr_of_failure(&mut renet(&["apply", path_arg(&board), "-g", "Nope"])?);
    assert!(stderr.contains("Error: No changes written to"), "{stderr}");
    assert!(stderr.contains("No group named 'Nope' on the board"), "{stderr}");
    Ok(())
}

fn add_loose_group(board: &Path) -> Result<String> {
    let source = std::fs::read_to_string(board)?;
    let end = source.rfind(')').expect("board ends with a paren");
    let loose = concat!(
        "\t(group \"Loose\"\n",
        "\t\t(uuid \"d0000000-0000-0000-0000-0000000000dd\")\n",
        "\t\t(members \"a0000000-0000-0000-0000-000000000001\" ",
        "\"c0000000-0000-0000-0000-000000000001\")\n",
        "\t)\n",
    );
    let patched = format!("{}{loose}{}", &source[..end], &source[end..]);
    std::fs::write(board, &patched)?;
    Ok(patched)
}

#[test]
fn incomplete_group_aborts_without_writing() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let before = add_loose_group(&board)?;

    let stderr = stderr_of_failure(&mut renet(&["apply", path_arg(&board)])?);
    assert!(
        stderr.contains("Group 'Loose' missing expected members: [mosfet, resistor10k, resistor220]"),
        "{stderr}"
    );
    assert_eq!(before, std::fs::read_to_string(&board)?);
    Ok(())
}

#[test]
fn skip_incomplete_processes_the_rest() -> Result<()> {
    let (_temp, board) = sandbox()?;
    add_loose_group(&board)?;

    let stdout = stdout_of(&mut renet(&["apply", "--skip-incomplete", path_arg(&board)])?);
    assert!(stdout.contains("Skipped Group 'Loose' missing expected members"), "{stdout}");
    assert!(stdout.contains("2 groups, 12 pads renamed, 6 nets created"), "{stdout}");
    Ok(())
}

#[test]
fn apply_json_report() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let stdout = stdout_of(&mut renet(&["apply", "-f", "json", "--dry-run", path_arg(&board)])?);
    let json: serde_json::Value = serde_json::from_str(&stdout)?;

    assert!(json["written"].is_null());
    assert_eq!(json["rebound_pads"], 12);
    assert_eq!(json["created_nets"][0], "/LD_37_K");
    assert_eq!(json["groups"][1]["name"], "Channel B");
    assert_eq!(json["groups"][1]["net_number"], "12");
    assert_eq!(json["groups"][1]["pads"][0]["net"], "VCC");
    assert!(json["groups"][1]["pads"][0]["renamed_to"].is_null());
    Ok(())
}

#[test]
fn groups_lists_roles_as_json() -> Result<()> {
    let (_temp, board) = sandbox()?;
    add_loose_group(&board)?;

    let stdout = stdout_of(&mut renet(&["groups", path_arg(&board), "--format", "json"])?);
    let json: serde_json::Value = serde_json::from_str(&stdout)?;
    let groups = json.as_array().unwrap();
    assert_eq!(groups.len(), 3);

    let a = &groups[0];
    assert_eq!(a["name"], "Channel A");
    assert_eq!(a["members"][4], "segment");
    assert_eq!(a["roles"]["laser"]["reference"], "LD37");
    assert_eq!(a["roles"]["resistor220"]["reference"], "R77");
    assert_eq!(a["net_number"], "37");

    // Member order decides which resistor is the 10k one
    assert_eq!(groups[1]["roles"]["resistor10k"]["reference"], "R21");

    let loose = &groups[2];
    assert_eq!(loose["members"][0], "Footprint LD37");
    assert_eq!(loose["members"][1], "gr_rect");
    assert!(loose.get("roles").is_none());
    assert!(loose["error"].as_str().unwrap().contains("missing expected members"));
    Ok(())
}

#[test]
fn groups_table_lists_members() -> Result<()> {
    let (_temp, board) = sandbox()?;
    let stdout = stdout_of(&mut renet(&["groups", path_arg(&board)])?);
    for needle in ["Channel A", "Channel B", "Footprint R76", "Q12", "37"] {
        assert!(stdout.contains(needle), "missing {needle} in {stdout}");
    }
    Ok(())
}

#[test]
fn unreadable_board_reports_path() -> Result<()> {
    let temp = TempDir::new()?;
    let missing = temp.child("nope.kicad_pcb");
    let stderr = stderr_of_failure(&mut renet(&["apply", path_arg(missing.path())])?);
    assert!(stderr.contains("Failed to read"), "{stderr}");
    assert!(stderr.contains("nope.kicad_pcb"), "{stderr}");
    Ok(())
}

#[test]
fn non_board_file_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let sch = temp.child("x.kicad_sch");
    sch.write_str("(kicad_sch (version 20231120))\n")?;
    let stderr = stderr_of_failure(&mut renet(&["groups", path_arg(sch.path())])?);
    assert!(stderr.contains("Not a KiCad board"), "{stderr}");
    assert!(stderr.contains("kicad_sch"), "{stderr}");
    Ok(())
}
