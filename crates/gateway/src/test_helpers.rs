//! # テスト用共通ヘルパー
//!
//! 署名機関・メタデータサーバー・ストレージ管理APIのモックサーバーを起動する。

/// 指定したRouterでモックHTTPサーバーを起動し、待ち受けポートを返す。
pub async fn start_mock_server(app: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    port
}
