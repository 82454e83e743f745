use std::io::Write;

use anyhow::Result;
use lucky_core::AppConfig;
use lucky_user::{AppCommand, Application};
use tempfile::TempDir;

fn config_for(db_url: &str) -> Result<AppConfig> {
    let toml = format!(
        r#"
        [database]
        url = "{db_url}"

        [retention]
        retention_multiplier = 1

        [[event_types]]
        id = "intro-call"
        strategy = "weighted"
        fairness_window = {{ type = "trailing_bookings", count = 4 }}

        [[event_types.hosts]]
        id = "alice"
        weight = 3

        [[event_types.hosts]]
        id = "bob"
        "#
    );
    AppConfig::from_toml(&toml)
}

/// 分配历史在进程重启后仍然影响选择
#[tokio::test]
async fn test_history_survives_restart() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("lucky.db");
    let db_url = format!("sqlite:{}", db_path.display());
    assert!(!db_path.exists());

    let first = Application::new(config_for(&db_url)?).await?;
    let report = first.simulate("intro-call", 3, None).await?;
    assert_eq!(report.selections, vec!["alice", "bob", "alice"]);
    first.shutdown().await;
    assert!(db_path.exists());

    let second = Application::new(config_for(&db_url)?).await?;
    let selection = second.select("intro-call", None).await?;
    assert_eq!(selection.host.id, "alice");
    assert_eq!(selection.record.id, 4);

    let stats = second.stats("intro-call").await?;
    assert_eq!(stats.total, 4);
    second.shutdown().await;

    Ok(())
}

#[tokio::test]
async fn test_prune_keeps_one_window_of_bookings() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite:{}", temp_dir.path().join("prune.db").display());

    let app = Application::new(config_for(&db_url)?).await?;
    app.simulate("intro-call", 10, None).await?;

    let output = app.execute(AppCommand::Prune).await?;
    assert_eq!(output["records_deleted"], 6);

    let stats = app.stats("intro-call").await?;
    assert_eq!(stats.total, 4);
    app.shutdown().await;

    Ok(())
}

#[tokio::test]
async fn test_load_config_file_and_select() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite:{}", temp_dir.path().join("file.db").display());
    let config_path = temp_dir.path().join("lucky-user.toml");

    let mut file = std::fs::File::create(&config_path)?;
    file.write_all(config_for(&db_url)?.to_toml()?.as_bytes())?;

    let config = AppConfig::load(config_path.to_str())?;
    let app = Application::new(config).await?;

    let output = app
        .execute(AppCommand::Select {
            event_type: "intro-call".to_string(),
            candidates: Some(vec!["bob".to_string()]),
        })
        .await?;
    assert_eq!(output["host"]["id"], "bob");
    assert_eq!(output["record"]["event_type_id"], "intro-call");
    app.shutdown().await;

    Ok(())
}
