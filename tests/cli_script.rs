use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn shell(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("claim_wizard_cli").unwrap();
    cmd.env("CLAIM_WIZARD_HOME", home.path())
        .env("CLAIM_WIZARD_CLI_SCRIPT", "1")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn script_mode_saves_the_claim() {
    let home = TempDir::new().unwrap();
    let input = "set claim-number CLM-77\nset selling-dealer \"Sunrise Motors\"\nsave\nprogress\nexit\n";

    shell(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Claim Number updated."))
        .stdout(contains("Claim saved."))
        .stdout(contains("Progress: 9%"));

    let saved = std::fs::read_to_string(home.path().join("session").join("claimFormData.json")).unwrap();
    assert!(saved.contains("\"CLM-77\""));
    assert!(saved.contains("\"Sunrise Motors\""));
}

#[test]
fn saved_claim_is_restored_on_the_next_run() {
    let home = TempDir::new().unwrap();
    shell(&home)
        .write_stdin("set claim-number CLM-78\nsave\nexit\n")
        .assert()
        .success();

    shell(&home)
        .write_stdin("show contract-info\nexit\n")
        .assert()
        .success()
        .stdout(contains("Restored saved claim."))
        .stdout(contains("CLM-78"));
}

#[test]
fn mistakes_are_reported_without_ending_the_session() {
    let home = TempDir::new().unwrap();
    shell(&home)
        .write_stdin("sumbit\nset claim-numbr X\nnext\nsubmit\nexit\n")
        .assert()
        .success()
        .stdout(contains("Suggestion: `submit`?"))
        .stdout(contains("Suggestion: `claim-number`?"))
        .stdout(contains("Section `dealer-info` is incomplete."))
        .stdout(contains("The claim is not ready to submit."))
        .stdout(contains("Exiting shell."));
}

#[test]
fn preview_of_an_incomplete_claim_warns_but_still_renders() {
    let home = TempDir::new().unwrap();
    shell(&home)
        .write_stdin("set claim-number CLM-79\nset comments \"unterminated\npreview\nexit\n")
        .assert()
        .success()
        .stdout(contains("Could not read that line"))
        .stdout(contains("Claim #: CLM-79"))
        .stdout(contains("Not ready to submit: missing required fields: selling-dealer"));
}
