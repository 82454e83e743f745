use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use lucky_core::{AppConfig, LogConfig, LogFormat};
use lucky_user::{AppCommand, Application};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<String>("config");
    let config = AppConfig::load(config_path.map(String::as_str))
        .with_context(|| match config_path {
            Some(path) => format!("加载配置文件失败: {path}"),
            None => "加载默认配置失败".to_string(),
        })?;

    // 命令行参数优先于配置文件
    let mut log_config = config.observability.clone();
    if let Some(level) = matches.get_one::<String>("log-level") {
        log_config.log_level = level.parse()?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        log_config.log_format = format.parse()?;
    }
    init_logging(&log_config)?;

    let command = parse_command(&matches)?;
    info!("执行命令: {:?}", command);

    let app = Application::new(config).await?;
    let result = app.execute(command).await;
    app.shutdown().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("命令执行失败: {e:#}");
            Err(e)
        }
    }
}

fn build_cli() -> Command {
    let event_type_arg = Arg::new("event-type")
        .short('e')
        .long("event-type")
        .value_name("ID")
        .help("事件类型ID")
        .required(true);

    let candidates_arg = Arg::new("candidates")
        .long("candidates")
        .value_name("HOSTS")
        .help("候选主持人ID，逗号分隔，默认使用事件类型的全部主持人")
        .value_delimiter(',');

    Command::new("lucky-user")
        .version("1.0.0")
        .about("预订主持人公平分配")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .global(true),
        )
        .subcommand(
            Command::new("select")
                .about("为一次预订选出主持人并记录分配")
                .arg(event_type_arg.clone())
                .arg(candidates_arg.clone()),
        )
        .subcommand(
            Command::new("simulate")
                .about("连续执行多次选择并输出分布")
                .arg(event_type_arg.clone())
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("选择次数")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("10"),
                )
                .arg(candidates_arg),
        )
        .subcommand(
            Command::new("stats")
                .about("查看公平窗口内的分配分布")
                .arg(event_type_arg),
        )
        .subcommand(Command::new("prune").about("清理超出保留范围的分配记录"))
}

fn parse_command(matches: &ArgMatches) -> Result<AppCommand> {
    let event_type = |sub: &ArgMatches| -> Result<String> {
        sub.get_one::<String>("event-type")
            .cloned()
            .context("缺少参数 --event-type")
    };
    let candidates = |sub: &ArgMatches| -> Option<Vec<String>> {
        sub.get_many::<String>("candidates")
            .map(|values| values.map(|v| v.trim().to_string()).collect())
    };

    match matches.subcommand() {
        Some(("select", sub)) => Ok(AppCommand::Select {
            event_type: event_type(sub)?,
            candidates: candidates(sub),
        }),
        Some(("simulate", sub)) => Ok(AppCommand::Simulate {
            event_type: event_type(sub)?,
            count: sub.get_one::<u32>("count").copied().unwrap_or(10),
            candidates: candidates(sub),
        }),
        Some(("stats", sub)) => Ok(AppCommand::Stats {
            event_type: event_type(sub)?,
        }),
        Some(("prune", _)) => Ok(AppCommand::Prune),
        Some((name, _)) => Err(anyhow::anyhow!("不支持的命令: {name}")),
        None => Err(anyhow::anyhow!("缺少子命令")),
    }
}

/// 初始化日志系统，输出到stderr，stdout只保留命令结果
fn init_logging(log_config: &LogConfig) -> Result<()> {
    log_config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_config.filter_directive()))
        .context("解析日志过滤指令失败")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_config.log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}
