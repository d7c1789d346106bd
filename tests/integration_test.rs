use order_location_sync::browser::{launch_browser, resolve, BrowserSession, Locator, Scope, Wait};
use order_location_sync::config::{ColumnStrategy, Config, SheetSelection, Timing};
use order_location_sync::infrastructure::{ChromiumSession, GoogleSheetsClient};
use order_location_sync::models::{AutomationRequest, OrderResult, WorkflowKind, WorkflowState};
use order_location_sync::progress::{encode_frame, FrameDecoder};
use order_location_sync::server::{self, AppState};
use order_location_sync::services::SheetGateway;
use order_location_sync::{logger, ChromiumFactory, PortalDriver};

fn snapshot(step: &str) -> WorkflowState {
    WorkflowState {
        is_running: true,
        current_step_id: step.to_string(),
        steps: Vec::new(),
        results: vec![OrderResult::success("BoltYYZ3-777", "12-A-3", "Location updated successfully")],
        error: None,
    }
}

#[test]
fn test_frames_survive_byte_by_byte_delivery() {
    let mut stream = String::new();
    for step in ["initialize", "navigate", "login"] {
        stream.push_str(&encode_frame(&snapshot(step)).unwrap());
    }

    let mut decoder = FrameDecoder::new();
    let mut received = Vec::new();
    for ch in stream.chars() {
        received.extend(decoder.push(&ch.to_string()));
    }

    let steps: Vec<_> = received.iter().map(|s| s.current_step_id.as_str()).collect();
    assert_eq!(steps, vec!["initialize", "navigate", "login"]);
    assert_eq!(received[2].results[0].location.as_deref(), Some("12-A-3"));
}

#[test]
fn test_toml_config_overrides_defaults() {
    let config = Config::from_toml_str(
        r#"
        facility = "YYZ7"

        [sheets]
        selection = "latest_date"

        [sheets.columns]
        strategy = "header"

        [batch]
        write_back = false
        "#,
    )
    .unwrap();

    assert_eq!(config.facility, "YYZ7");
    assert_eq!(config.order_prefix, "BoltYYZ3");
    assert_eq!(config.sheets.selection, SheetSelection::LatestDate);
    assert_eq!(config.sheets.columns, ColumnStrategy::Header);
    assert!(!config.batch.write_back);
    assert_eq!(config.batch.cap, Some(5));
}

#[test]
fn test_request_wire_format() {
    let request: AutomationRequest =
        serde_json::from_str(r#"{"username":"u","password":"p","googleSheetUrl":"https://x/d/ABC/edit"}"#)
            .unwrap();
    let validated = request.validate(WorkflowKind::OrderSync).unwrap();
    assert_eq!(validated.sheet_url.as_deref(), Some("https://x/d/ABC/edit"));
    assert!(!format!("{:?}", validated).contains("\"p\""));
}

#[tokio::test]
async fn test_server_state_with_production_clients() {
    let config = Config::default();
    let sheets = GoogleSheetsClient::new(&config.sheets).unwrap();
    let state = AppState::new(config, ChromiumFactory, sheets);

    let _router = server::router(state.clone());
    assert_eq!(state.handed_over().await, 0);
    state.close_all().await;
}

#[tokio::test]
#[ignore] // 需要本机安装 Chrome：cargo test -- --ignored
async fn test_scoped_xpath_probe() {
    logger::init(true);
    let config = Config {
        browser: order_location_sync::config::BrowserOptions {
            headless: true,
            ..Default::default()
        },
        ..Config::default()
    };

    let (browser, page, handler) = launch_browser(&config.browser, &config.timing)
        .await
        .expect("启动浏览器失败");
    let session = ChromiumSession::new(browser, page, handler, &config.timing);

    session
        .run_script(
            r#"document.body.innerHTML = '<div class="outside">YYZ5</div>' +
               '<div class="ant-modal-content"><div class="ant-select">YYZ5</div></div>'; true"#,
        )
        .await
        .expect("写入页面失败");

    let wait = Wait::from_ms(2_000, &Timing::default());
    let modal = resolve(&session, Scope::Page, &[Locator::css(".ant-modal-content")], wait)
        .await
        .expect("找不到弹窗");
    let inner = resolve(
        &session,
        Scope::within(&modal.element, "facility modal"),
        &[Locator::text("YYZ5")],
        wait,
    )
    .await
    .expect("作用域内找不到文本");

    assert_eq!(session.text(&inner.element).await.unwrap(), "YYZ5");
    session.quit().await.expect("关闭浏览器失败");
}

#[tokio::test]
#[ignore] // 需要门户账号：PORTAL_USERNAME / PORTAL_PASSWORD
async fn test_portal_login_and_facility() {
    logger::init(true);
    let config = Config::from_env().expect("配置错误");
    let username = std::env::var("PORTAL_USERNAME").expect("缺少 PORTAL_USERNAME");
    let password = std::env::var("PORTAL_PASSWORD").expect("缺少 PORTAL_PASSWORD");

    let mut driver = PortalDriver::new(ChromiumFactory, &config);
    driver.initialize().await.expect("启动浏览器失败");
    driver.navigate_to_login().await.expect("打开登录页失败");
    driver.login(&username, &password).await.expect("登录失败");
    driver.select_facility().await.expect("选择仓库失败");
    driver.close().await.expect("关闭浏览器失败");
}

#[tokio::test]
#[ignore] // 需要 GOOGLE_SHEETS_ACCESS_TOKEN 和 TEST_SHEET_URL
async fn test_live_sheet_read() {
    logger::init(true);
    let config = Config::from_env().expect("配置错误");
    let url = std::env::var("TEST_SHEET_URL").expect("缺少 TEST_SHEET_URL");

    let client = GoogleSheetsClient::new(&config.sheets).expect("表格客户端配置错误");
    let gateway = SheetGateway::new(client, &config.sheets);
    let orders = gateway.read_all_orders(&url).await.expect("读取表格失败");

    assert!(orders.iter().all(|o| !o.order_number.is_empty()));
}
