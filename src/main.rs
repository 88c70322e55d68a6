use clap::Parser;
use vin_scan::{camera, cli, client, config, error, logging, output, scan};
use camera::{CaptureSurface, FileCamera, FolderCamera};
use cli::{Cli, Commands};
use client::RecognitionClient;
use config::Config;
use error::Result;
use vin_scan_common::{render_rows, FilterOption, ResponseContract};

/// 設定ファイル → 環境変数 → CLI引数 の順で上書き
fn load_config(server_url: Option<String>, contract: Option<ResponseContract>) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_overrides(server_url, contract)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan { image, source_dir, filters, yes } => {
            let config = load_config(cli.server_url, cli.contract)?;

            println!("🚗 vin-scan - 書類スキャン\n");
            println!("  送信先: {}\n", config.endpoint());

            let client = RecognitionClient::new(&config)?;
            let mut surface: Box<dyn CaptureSurface> = match image {
                Some(path) => Box::new(FileCamera::new(path)),
                None => {
                    let dir = match source_dir {
                        Some(dir) => dir,
                        None => config.resolve_capture_dir()?,
                    };
                    println!("  撮影フォルダ: {}\n", dir.display());
                    Box::new(FolderCamera::new(dir, config.camera_access_granted || yes))
                }
            };

            scan::run_interactive_scan(surface.as_mut(), &client, &filters, Config::persist_camera_access)
                .await?;
            println!("\n✅ 終了");
        }

        Commands::Upload { image, filters, json } => {
            let config = load_config(cli.server_url, cli.contract)?;
            let client = RecognitionClient::new(&config)?;
            let mut surface = FileCamera::new(image);

            if !json {
                println!("📤 送信中... ({})", client.endpoint());
            }
            let fields = scan::run_headless_scan(&mut surface, &client, &filters).await?;

            if json {
                println!("{}", serde_json::to_string(&fields)?);
            } else {
                println!("✔ 認識結果:");
                output::print_rows(&render_rows(&fields));
            }
        }

        Commands::Filters => {
            println!("フィルタ一覧:");
            for option in FilterOption::ALL {
                println!("  {:<18} {}", option.id(), option.label());
            }
        }

        Commands::Config {
            set_server_url,
            set_contract,
            set_timeout,
            set_capture_dir,
            revoke_camera_access,
            show,
        } => {
            // 上書き前のファイル内容を編集する（壊れていれば既定値から）
            let path = Config::config_path()?;
            let mut stored = Config::load_for_edit(&path);
            let mut changed = false;

            if let Some(url) = set_server_url {
                stored.set_server_url(url)?;
                changed = true;
            }
            if let Some(contract) = set_contract {
                stored.contract = contract;
                changed = true;
            }
            if let Some(seconds) = set_timeout {
                stored.timeout_seconds = seconds;
                changed = true;
            }
            if let Some(dir) = set_capture_dir {
                stored.capture_dir = Some(dir);
                changed = true;
            }
            if revoke_camera_access {
                stored.camera_access_granted = false;
                changed = true;
            }

            if changed {
                stored.save_to(&path)?;
                println!("✔ 設定を保存しました: {}", path.display());
            }

            let mut config = stored;
            config.apply_env()?;
            config.apply_overrides(cli.server_url, cli.contract)?;

            if show || !changed {
                println!("設定:");
                println!("  サーバーURL: {}", config.server_url);
                println!("  レスポンス形式: {}", config.contract);
                println!("  送信先: {}", config.endpoint());
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                match config.resolve_capture_dir() {
                    Ok(dir) => println!("  撮影フォルダ: {}", dir.display()),
                    Err(_) => println!("  撮影フォルダ: 未設定"),
                }
                println!(
                    "  撮影フォルダへのアクセス: {}",
                    if config.camera_access_granted { "許可済み" } else { "未許可" }
                );
            }
        }
    }

    Ok(())
}
