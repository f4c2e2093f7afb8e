//! Ancestry walks over scripted hg and git histories, matched against real
//! equivalence databases.

use std::sync::Arc;

use equisync_core::db::{Db, Equivalence, FileDb, SqliteDb};
use equisync_core::errors::RepositoryError;
use equisync_core::git::GitRevisionHistory;
use equisync_core::hg::parser::METADATA_TEMPLATE;
use equisync_core::hg::HgRevisionHistory;
use equisync_core::testing::{ScriptedCommandRunner, StaticClone};
use equisync_core::{find_revisions, EquivalenceMatcher, Revision, SearchType};

const HG_DIR: &str = "/tmp/hg_clone_repo2_1";
const GIT_DIR: &str = "/tmp/git_clone_public_1";
const DATE: &str = "2012-07-09 06:00 -0700";

/// repo1{1002} == repo2{2}
const TEST_DB: &str = r#"{"equivalences":[
    {"rev1": {"revId":"1002","repositoryName":"repo1"},
     "rev2": {"revId":"2","repositoryName":"repo2"}}]}"#;

/// repo1{1005} == repo2{5}, outside the ancestry of repo2{4}.
const UNREACHABLE_DB: &str = r#"{"equivalences":[
    {"rev1": {"revId":"1005","repositoryName":"repo1"},
     "rev2": {"revId":"5","repositoryName":"repo2"}}]}"#;

fn hg_history(cmd: &Arc<ScriptedCommandRunner>) -> HgRevisionHistory {
    HgRevisionHistory::new(cmd.clone(), Arc::new(StaticClone::hg("repo2", HG_DIR, "default")))
}

fn expect_hg_heads(cmd: &ScriptedCommandRunner, output: &str) {
    cmd.expect(
        "hg",
        &["heads", "default", "--template={node} {branch}\n"],
        HG_DIR,
        output,
    );
}

fn expect_hg_log(cmd: &ScriptedCommandRunner, rev: &str, parents: &str) {
    cmd.expect_args(
        "hg",
        vec![
            "log".into(),
            format!("--rev={rev}"),
            "--limit=1".into(),
            format!("--template={METADATA_TEMPLATE}"),
            "--debug".into(),
        ],
        HG_DIR,
        &format!("{rev} < author < {DATE} < description < {parents}"),
    );
}

fn ids(revisions: &[Revision]) -> Vec<&str> {
    revisions.iter().map(|r| r.rev_id.as_str()).collect()
}

#[test]
fn branched_walk_stops_at_last_equivalence() {
    let cmd = Arc::new(ScriptedCommandRunner::new());
    expect_hg_heads(&cmd, "4 default\n");
    expect_hg_log(&cmd, "4", "par1:3a par2:3b");
    expect_hg_log(&cmd, "3a", "par1:2 -1:0");
    expect_hg_log(&cmd, "3b", "par1:2 -1:0");

    let db = FileDb::from_text(TEST_DB).unwrap();
    let matcher = EquivalenceMatcher::new("repo1", &db);
    let result = find_revisions(&hg_history(&cmd), None, &matcher, SearchType::Branched).unwrap();

    assert_eq!(
        result.equivalences(),
        &[Equivalence::new(Revision::new("1002", "repo1"), Revision::new("2", "repo2")).unwrap()]
    );
    let graph = result.revisions_since_equivalence();
    assert_eq!(ids(graph.breadth_first_history()), vec!["4", "3a", "3b"]);
    assert_eq!(
        graph.metadata(&Revision::new("4", "repo2")).unwrap().parents,
        vec![Revision::new("3a", "repo2"), Revision::new("3b", "repo2")]
    );
    // No metadata query for the matching revision 2.
    cmd.verify();
}

#[test]
fn linear_walk_follows_first_parent_only() {
    let cmd = Arc::new(ScriptedCommandRunner::new());
    expect_hg_heads(&cmd, "4 default\n");
    expect_hg_log(&cmd, "4", "par1:3a par2:3b");
    expect_hg_log(&cmd, "3a", "par1:2 -1:0");

    let db = FileDb::from_text(TEST_DB).unwrap();
    let matcher = EquivalenceMatcher::new("repo1", &db);
    let result = find_revisions(&hg_history(&cmd), None, &matcher, SearchType::Linear).unwrap();

    assert_eq!(result.equivalences().len(), 1);
    assert_eq!(
        ids(result.revisions_since_equivalence().breadth_first_history()),
        vec!["4", "3a"]
    );
    cmd.verify();
}

#[test]
fn walk_past_unreachable_equivalence_lists_every_ancestor() {
    let cmd = Arc::new(ScriptedCommandRunner::new());
    expect_hg_log(&cmd, "4", "par1:3a par2:3b");
    expect_hg_log(&cmd, "3a", "par1:2 -1:0");
    expect_hg_log(&cmd, "3b", "par1:2 -1:0");
    expect_hg_log(&cmd, "2", "-1:0 -1:0");

    let db = FileDb::from_text(UNREACHABLE_DB).unwrap();
    let matcher = EquivalenceMatcher::new("repo1", &db);
    let start = Revision::new("4", "repo2");
    let result =
        find_revisions(&hg_history(&cmd), Some(&start), &matcher, SearchType::Branched).unwrap();

    assert!(result.equivalences().is_empty());
    assert_eq!(
        ids(result.revisions_since_equivalence().breadth_first_history()),
        vec!["4", "3a", "3b", "2"]
    );
    cmd.verify();
}

#[test]
fn linear_walk_rejects_several_heads() {
    let cmd = Arc::new(ScriptedCommandRunner::new());
    expect_hg_heads(&cmd, "4 default\n5 stable\n");

    let db = FileDb::default();
    let matcher = EquivalenceMatcher::new("repo1", &db);
    let err = find_revisions(&hg_history(&cmd), None, &matcher, SearchType::Linear).unwrap_err();
    assert!(matches!(err, RepositoryError::AmbiguousLinearStart { heads: 2, .. }));
    cmd.verify();
}

#[test]
fn failing_metadata_query_aborts_walk() {
    let cmd = Arc::new(ScriptedCommandRunner::new());
    expect_hg_log(&cmd, "4", "par1:3a -1:0");
    cmd.expect_args(
        "hg",
        vec![
            "log".into(),
            "--rev=3a".into(),
            "--limit=1".into(),
            format!("--template={METADATA_TEMPLATE}"),
            "--debug".into(),
        ],
        HG_DIR,
        "garbage",
    );

    let db = FileDb::default();
    let matcher = EquivalenceMatcher::new("repo1", &db);
    let start = Revision::new("4", "repo2");
    let err = find_revisions(&hg_history(&cmd), Some(&start), &matcher, SearchType::Branched)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::MalformedMetadata { .. }));
    cmd.verify();
}

#[test]
fn git_walk_against_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = SqliteDb::new(dir.path().join("equivalences.db")).unwrap();
    db.initialize().unwrap();
    db.note_equivalence(
        Equivalence::new(Revision::new("base", "public"), Revision::new("1002", "internal"))
            .unwrap(),
    )
    .unwrap();

    let cmd = Arc::new(ScriptedCommandRunner::new());
    let log = |sha: &str, parents: &str| {
        cmd.expect(
            "git",
            &[
                "log",
                "--max-count=1",
                "--date=iso-strict",
                "--format=%H%x00%an <%ae>%x00%ad%x00%P%x00%B",
                sha,
                "--",
            ],
            GIT_DIR,
            &format!("{sha}\0Dev <dev@example.com>\02012-07-09T06:00:00-07:00\0{parents}\0msg {sha}\n"),
        );
    };
    cmd.expect(
        "git",
        &[
            "for-each-ref",
            "--format=%(objectname) %(refname:short)",
            "refs/heads",
            "refs/remotes/origin",
        ],
        GIT_DIR,
        "tip main\ntip origin/main\nother topic\n",
    );
    log("tip", "mid");
    log("mid", "base");

    let history =
        GitRevisionHistory::new(cmd.clone(), Arc::new(StaticClone::git("public", GIT_DIR, "main")));
    let matcher = EquivalenceMatcher::new("internal", &db);
    let result = find_revisions(&history, None, &matcher, SearchType::Linear).unwrap();

    let (equivalences, graph) = result.into_parts();
    assert_eq!(equivalences.len(), 1);
    assert_eq!(equivalences[0].rev1(), &Revision::new("base", "public"));
    assert_eq!(ids(graph.breadth_first_history()), vec!["tip", "mid"]);
    assert_eq!(
        graph.metadata(&Revision::new("mid", "public")).unwrap().description,
        "msg mid"
    );
    cmd.verify();
}
