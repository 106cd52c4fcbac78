// tests/update.rs

//! Index update pipeline against signed file:// repositories: trust on
//! first use, conditional fetches, mirror failover, and key rotation.

mod common;

use kiosk::catalog;
use kiosk::catalog::sync::{UpdateStatus, Updater};
use kiosk::config::CorePaths;
use kiosk::db;
use kiosk::db::models::{RepoMirror, Repository};
use kiosk::trust::signing::SigningKeyPair;
use kiosk::{Error, TrustError};

#[test]
fn test_first_use_trust_then_refresh_lifecycle() {
    let repo_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let keypair = SigningKeyPair::generate();
    let address = common::publish(
        repo_dir.path(),
        &keypair,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![common::version("org.example.alpha", 3, b"alpha v3")],
            )],
        ),
    );

    let paths = CorePaths::at(state_dir.path().join("kiosk"));
    paths.ensure_layout().unwrap();
    let conn = db::init(&paths.db_path()).unwrap();
    let repo = common::add_repo(&conn, &address, 1);
    let repo_id = repo.id.unwrap();
    drop(conn);

    // The key is unknown, so the first update only reports it
    let updater = Updater::new(paths.db_path()).unwrap();
    let status = updater.update_repository(repo_id).unwrap();
    assert_eq!(
        status,
        UpdateStatus::FirstUse {
            fingerprint: keypair.fingerprint()
        }
    );

    let conn = db::open(&paths.db_path()).unwrap();
    assert_eq!(catalog::app_count(&conn).unwrap(), 0);
    // No validator is stored either; the next fetch must see the full
    // document again
    let mut stored = Repository::find_by_id(&conn, repo_id).unwrap().unwrap();
    assert!(stored.etag.is_none());

    stored.set_fingerprint(&conn, &keypair.fingerprint()).unwrap();
    drop(conn);

    let status = updater.update_repository(repo_id).unwrap();
    assert_eq!(status, UpdateStatus::Updated { apps: 1, apks: 1 });

    let conn = db::open(&paths.db_path()).unwrap();
    let resolved = catalog::resolve_app(&conn, "org.example.alpha").unwrap().unwrap();
    assert_eq!(resolved.app.name.as_deref(), Some("Alpha"));
    let stored = Repository::find_by_id(&conn, repo_id).unwrap().unwrap();
    assert!(stored.etag.is_some());
    drop(conn);

    // Nothing changed upstream; the conditional fetch answers for us
    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Unchanged
    );

    // A new build appears upstream
    common::publish(
        repo_dir.path(),
        &keypair,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![
                    common::version("org.example.alpha", 4, b"alpha v4"),
                    common::version("org.example.alpha", 3, b"alpha v3"),
                ],
            )],
        ),
    );
    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Updated { apps: 1, apks: 2 }
    );

    let conn = db::open(&paths.db_path()).unwrap();
    let union = catalog::apks_for_package(&conn, "org.example.alpha").unwrap();
    assert_eq!(union.len(), 2);
    assert_eq!(union[0].apk.version_code, 4);
}

#[test]
fn test_mirror_serves_while_canonical_address_is_down() {
    let mirror_dir = tempfile::tempdir().unwrap();
    let keypair = SigningKeyPair::generate();
    let mirror_address = common::publish(
        mirror_dir.path(),
        &keypair,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![common::version("org.example.alpha", 3, b"alpha v3")],
            )],
        ),
    );

    let (_state, db_path) = common::setup_db();
    let conn = db::open(&db_path).unwrap();
    let dead_address = "file:///nonexistent/kiosk-update-test";
    let repo_id = common::add_pinned_repo(&conn, dead_address, 1, &keypair);
    RepoMirror::new(repo_id, &mirror_address, true).insert(&conn).unwrap();
    drop(conn);

    let updater = Updater::new(&db_path).unwrap();
    let status = updater.update_repository(repo_id).unwrap();
    assert!(matches!(status, UpdateStatus::Updated { .. }));

    let conn = db::open(&db_path).unwrap();
    assert!(catalog::resolve_app(&conn, "org.example.alpha").unwrap().is_some());

    // The canonical address has no mirror row, so only the mirror's
    // health is tracked
    let mirrors = RepoMirror::find_by_repository(&conn, repo_id).unwrap();
    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[0].url, mirror_address);
    assert_eq!(mirrors[0].success_count, 1);
    assert_eq!(mirrors[0].error_count, 0);
    assert!(mirrors[0].last_used.is_some());
    drop(conn);

    // A not-modified answer records no traffic at all
    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Unchanged
    );
    let conn = db::open(&db_path).unwrap();
    let mirrors = RepoMirror::find_by_repository(&conn, repo_id).unwrap();
    assert_eq!(mirrors[0].success_count, 1);
    assert_eq!(mirrors[0].error_count, 0);
}

#[test]
fn test_rotated_signing_key_requires_new_trust_decision() {
    let repo_dir = tempfile::tempdir().unwrap();
    let original_key = SigningKeyPair::generate();
    let address = common::publish(
        repo_dir.path(),
        &original_key,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![common::version("org.example.alpha", 3, b"alpha v3")],
            )],
        ),
    );

    let (_state, db_path) = common::setup_db();
    let conn = db::open(&db_path).unwrap();
    let repo_id = common::add_pinned_repo(&conn, &address, 1, &original_key);
    drop(conn);

    let updater = Updater::new(&db_path).unwrap();
    assert!(matches!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Updated { .. }
    ));

    // The publisher rotates to a new, perfectly valid key
    let rotated_key = SigningKeyPair::generate();
    common::publish(
        repo_dir.path(),
        &rotated_key,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![
                    common::version("org.example.alpha", 4, b"alpha v4"),
                    common::version("org.example.alpha", 3, b"alpha v3"),
                ],
            )],
        ),
    );

    let err = updater.update_repository(repo_id).unwrap_err();
    match err {
        Error::Trust(TrustError::FingerprintChanged { pinned, observed }) => {
            assert_eq!(pinned, original_key.fingerprint());
            assert_eq!(observed, rotated_key.fingerprint());
        }
        other => panic!("expected FingerprintChanged, got {other:?}"),
    }

    // The catalog keeps serving the last trusted snapshot
    let conn = db::open(&db_path).unwrap();
    let union = catalog::apks_for_package(&conn, "org.example.alpha").unwrap();
    assert_eq!(union.len(), 1);
    assert_eq!(union[0].apk.version_code, 3);

    // Accepting the new key is an explicit step, after which updates flow
    let mut repo = Repository::find_by_id(&conn, repo_id).unwrap().unwrap();
    repo.set_fingerprint(&conn, &rotated_key.fingerprint()).unwrap();
    drop(conn);

    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Updated { apps: 1, apks: 2 }
    );
}

#[test]
fn test_update_all_merges_repositories_and_isolates_failures() {
    let main_dir = tempfile::tempdir().unwrap();
    let archive_dir = tempfile::tempdir().unwrap();
    let main_key = SigningKeyPair::generate();
    let archive_key = SigningKeyPair::generate();

    let main_address = common::publish(
        main_dir.path(),
        &main_key,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha Main")],
            vec![(
                "org.example.alpha",
                vec![common::version("org.example.alpha", 3, b"alpha v3 main")],
            )],
        ),
    );
    let archive_address = common::publish(
        archive_dir.path(),
        &archive_key,
        &common::index_doc(
            "Archive",
            vec![common::app("org.example.alpha", "Alpha Archive")],
            vec![(
                "org.example.alpha",
                vec![
                    common::version("org.example.alpha", 2, b"alpha v2"),
                    common::version("org.example.alpha", 1, b"alpha v1"),
                ],
            )],
        ),
    );

    let (_state, db_path) = common::setup_db();
    let conn = db::open(&db_path).unwrap();
    common::add_pinned_repo(&conn, &main_address, 1, &main_key);
    common::add_pinned_repo(&conn, &archive_address, 2, &archive_key);
    common::add_repo(&conn, "file:///nonexistent/kiosk-update-all", 3);
    drop(conn);

    let updater = Updater::new(&db_path).unwrap();
    let outcomes = updater.update_all().unwrap();
    assert_eq!(outcomes.len(), 3);

    for outcome in &outcomes {
        if outcome.address == main_address || outcome.address == archive_address {
            assert!(matches!(
                outcome.result,
                Ok(UpdateStatus::Updated { .. })
            ));
        } else {
            assert!(matches!(outcome.result, Err(Error::Unreachable { .. })));
        }
    }

    // One unreachable repository never blocks the merged view
    let conn = db::open(&db_path).unwrap();
    let resolved = catalog::resolve_app(&conn, "org.example.alpha").unwrap().unwrap();
    assert_eq!(resolved.app.name.as_deref(), Some("Alpha Main"));
    assert_eq!(
        catalog::apks_for_package(&conn, "org.example.alpha").unwrap().len(),
        3
    );
}

#[test]
fn test_cleared_validator_forces_full_refetch() {
    let repo_dir = tempfile::tempdir().unwrap();
    let keypair = SigningKeyPair::generate();
    let address = common::publish(
        repo_dir.path(),
        &keypair,
        &common::index_doc(
            "Main",
            vec![common::app("org.example.alpha", "Alpha")],
            vec![(
                "org.example.alpha",
                vec![common::version("org.example.alpha", 3, b"alpha v3")],
            )],
        ),
    );

    let (_state, db_path) = common::setup_db();
    let conn = db::open(&db_path).unwrap();
    let repo_id = common::add_pinned_repo(&conn, &address, 1, &keypair);
    drop(conn);

    let updater = Updater::new(&db_path).unwrap();
    assert!(matches!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Updated { .. }
    ));
    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Unchanged
    );

    // Dropping the stored validator is how a forced refresh works; the
    // same content is fetched and ingested again in full
    let conn = db::open(&db_path).unwrap();
    let mut repo = Repository::find_by_id(&conn, repo_id).unwrap().unwrap();
    repo.etag = None;
    repo.update(&conn).unwrap();
    drop(conn);

    assert_eq!(
        updater.update_repository(repo_id).unwrap(),
        UpdateStatus::Updated { apps: 1, apks: 1 }
    );
}
