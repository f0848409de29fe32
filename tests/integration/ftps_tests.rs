//! FTPS backend tests

use std::io::Cursor;

use tokio::io::AsyncReadExt;

use remote_transfer::{BackendKind, Client, Error};

use super::fixtures::{acquire_test_lock, ftps_server, unique_name};

#[tokio::test]
async fn test_store_and_retrieve() {
    let server = skip_if_no_server!(ftps_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(true))
        .await
        .expect("Failed to connect");
    assert_eq!(client.backend_kind(), BackendKind::Ftps);

    let path = server.path(&unique_name("stored", "conf"));
    let payload = b"[server]\nport = 8443\n".to_vec();

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
    assert!(info.modified.is_some());

    client.remove(&path).await.expect("remove failed");
    client.close().await;
}

#[tokio::test]
async fn test_glob_listing() {
    let server = skip_if_no_server!(ftps_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(true))
        .await
        .expect("Failed to connect");
    let stem = unique_name("glob", "d");
    let txt = format!("{}-a.txt", stem);
    let log = format!("{}-a.log", stem);
    for name in [&txt, &log] {
        client
            .upload_file(&server.path(name), Cursor::new(b"x".to_vec()))
            .await
            .expect("upload failed");
    }

    let matches = client
        .glob(&server.path(&format!("{}-*.txt", stem)))
        .await
        .expect("glob failed");
    assert_eq!(matches, vec![server.path(&txt)]);

    for name in [&txt, &log] {
        client.remove(&server.path(name)).await.expect("remove failed");
    }
    client.close().await;
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let server = skip_if_no_server!(ftps_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(true))
        .await
        .expect("Failed to connect");

    let err = client
        .download(&server.path(&unique_name("missing", "txt")))
        .await
        .err()
        .expect("download of missing file");
    assert!(err.is_not_found(), "unexpected error: {}", err);

    client.close().await;
}

#[tokio::test]
async fn test_create_is_unsupported() {
    let server = skip_if_no_server!(ftps_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(true))
        .await
        .expect("Failed to connect");

    let err = client
        .create(&server.path("never-created.txt"))
        .await
        .err()
        .expect("create over ftps");
    assert!(matches!(err, Error::Unsupported("create")));

    client.close().await;
    client.close().await;
}

#[tokio::test]
async fn test_directory_stat() {
    let server = skip_if_no_server!(ftps_server());
    let _guard = acquire_test_lock().await;

    let mut client = Client::connect(server.config(true))
        .await
        .expect("Failed to connect");

    let info = client.info(&server.dir).await.expect("stat of directory failed");
    assert!(info.is_dir);

    client.close().await;
}
