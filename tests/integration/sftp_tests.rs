//! SFTP backend tests

use std::io::Cursor;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use remote_transfer::{BackendKind, Client, Error};

use super::fixtures::{acquire_test_lock, sftp_server, unique_name};

#[tokio::test]
async fn test_upload_download_roundtrip() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");
    assert_eq!(client.backend_kind(), BackendKind::Sftp);

    let path = server.path(&unique_name("roundtrip", "bin"));
    let payload: Vec<u8> = (0..2_500_000u32).map(|i| (i % 251) as u8).collect();

    let stored = client
        .upload_file(&path, Cursor::new(payload.clone()))
        .await
        .expect("upload failed");
    assert_eq!(stored, payload.len() as u64);

    let mut reader = client.download(&path).await.expect("download failed");
    let mut fetched = Vec::new();
    reader.read_to_end(&mut fetched).await.expect("read failed");
    assert_eq!(fetched, payload);

    let info = client.info(&path).await.expect("stat failed");
    assert_eq!(info.size, payload.len() as u64);
    assert!(!info.is_dir);
    assert!(info.modified.is_some());

    client.remove(&path).await.expect("remove failed");
    client.close().await;
}

#[tokio::test]
async fn test_create_and_chunked_upload() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");
    let path = server.path(&unique_name("created", "txt"));

    let mut file = client.create(&path).await.expect("create failed");
    let mut source = Cursor::new(b"listen 8080\nworkers 4\n".to_vec());
    let copied = client
        .upload(&mut source, &mut file, 5)
        .await
        .expect("upload failed");
    assert_eq!(copied, 22);

    file.rewind().await.expect("seek failed");
    let mut contents = String::new();
    file.read_to_string(&mut contents).await.expect("read failed");
    assert_eq!(contents, "listen 8080\nworkers 4\n");
    drop(file);

    client.remove(&path).await.expect("remove failed");
    client.close().await;
}

#[tokio::test]
async fn test_glob_sorted_matches() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");
    let stem = unique_name("glob", "d");
    let names = [
        format!("{}-b.txt", stem),
        format!("{}-a.txt", stem),
        format!("{}-a.log", stem),
    ];
    for name in &names {
        client
            .upload_file(&server.path(name), Cursor::new(b"x".to_vec()))
            .await
            .expect("upload failed");
    }

    let matches = client
        .glob(&server.path(&format!("{}-*.txt", stem)))
        .await
        .expect("glob failed");
    assert_eq!(
        matches,
        vec![
            server.path(&format!("{}-a.txt", stem)),
            server.path(&format!("{}-b.txt", stem)),
        ]
    );

    let missing = client
        .glob(&server.path("definitely-not-here.txt"))
        .await
        .expect("literal glob failed");
    assert!(missing.is_empty());

    let err = client.glob(&server.path("[unterminated")).await.unwrap_err();
    assert!(matches!(err, Error::BadPattern(_)));

    for name in &names {
        client.remove(&server.path(name)).await.expect("remove failed");
    }
    client.close().await;
}

#[tokio::test]
async fn test_missing_file_errors() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");
    let path = server.path(&unique_name("missing", "txt"));

    let err = client.download(&path).await.err().expect("download of missing file");
    assert!(err.is_not_found(), "unexpected error: {}", err);

    let err = client.info(&path).await.unwrap_err();
    assert!(matches!(err, Error::FileStats(_)));
    assert!(err.is_not_found());

    client.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent_and_reconnects() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");
    client.close().await;
    client.close().await;
    assert!(!client.is_connected());

    // the next operation dials again
    client.glob(&server.path("*")).await.expect("glob after close");
    assert!(client.is_connected());
    client.close().await;
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut config = server.config(false);
    config.password = Some(secrecy::SecretString::from("wrong-password".to_string()));

    let err = Client::connect(config).await.err().expect("bad password");
    assert!(matches!(err, Error::Authentication(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_session_is_reused_between_operations() {
    let server = skip_if_no_server!(sftp_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(false))
        .await
        .expect("Failed to connect");

    // every call after the first round-trips a keep-alive on the held session
    for _ in 0..3 {
        let info = client.info(&server.dir).await.expect("stat failed");
        assert!(info.is_dir);
    }
    assert!(client.is_connected());

    client.close().await;
}
