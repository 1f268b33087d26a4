//! Live-browser checks. Ignored by default; run against a browser started
//! with --remote-debugging-port: cargo test -- --ignored

use labrunner::browser::{connect_to_browser_and_page, CdpConnector, LoginForm};
use labrunner::session::SessionConnector;
use labrunner::utils::logging;
use labrunner::Config;

#[tokio::test]
#[ignore]
async fn connects_to_a_running_browser() {
    logging::init();
    let config = Config::from_env();

    let result =
        connect_to_browser_and_page(config.browser_debug_port, Some(&config.entry_url), None)
            .await;
    assert!(result.is_ok(), "browser connection should succeed");
}

#[tokio::test]
#[ignore]
async fn opens_a_session_on_the_entry_screen() {
    logging::init();
    let config = Config::from_env();

    let connector = CdpConnector::new(config.browser_debug_port, LoginForm::default());
    let session = connector
        .open(&config.entry_url)
        .await
        .expect("session should open");

    let context = session
        .current_context()
        .await
        .expect("context should be readable");
    println!("current context: {context}");
}
