use anyhow::{Context, Result};
use clap::Parser;
use lesion_vision::{cli, config, export, inline, orchestrator, records, server, session, upload};
use cli::{Cli, Commands};
use config::Config;
use lesion_vision_common::{DetectionAggregate, LesionCategory, PatientInfo};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load().context("設定の読み込みに失敗しました")?;
    let timeout = Duration::from_secs(config.timeout_seconds);

    match cli.command {
        Commands::Upload { image, session } => {
            println!("🩺 lesion-vision - 画像アップロード\n");
            let folder = session.unwrap_or_else(|| PathBuf::from("."));

            println!("[1/2] アップロード中... ({})", image.display());
            let uploader = upload::Uploader::new(&config.upload, timeout)?;
            let url = uploader.upload_file(&image).await?;
            println!("✔ アップロード完了: {}\n", url);

            println!("[2/2] セッションに登録中...");
            let _lock = session::RunLock::acquire(&folder)
                .with_context(|| format!("detect の実行中は画像を変更できません: {}", folder.display()))?;
            let mut file = session::SessionFile::load(&folder);
            let had_results = !file.session().results().is_empty();
            file.session_mut().set_image(url);
            if had_results && file.session().results().is_empty() {
                println!("- 新しい画像のため過去の検出結果をクリアしました");
            }
            file.save(&folder)?;
            println!("✔ セッション保存: {}", session::SessionFile::session_path(&folder).display());
        }

        Commands::Detect { image, types, session } => {
            println!("🔬 lesion-vision - パターン検出\n");
            let folder = session.unwrap_or_else(|| PathBuf::from("."));
            // 読み込みから保存までをロックで囲む
            let _lock = session::RunLock::acquire(&folder).with_context(|| {
                format!(
                    "別の detect が実行中です（異常終了した場合は session --clear で解除）: {}",
                    folder.display()
                )
            })?;
            let mut file = session::SessionFile::load(&folder);

            if let Some(image) = image {
                file.session_mut().set_image(image);
            }
            file.session_mut().begin_run()?;
            let image = file
                .session()
                .image_reference()
                .map(str::to_string)
                .unwrap_or_default();

            let categories = types.resolve();
            println!("[1/2] 検出中... ({}カテゴリ)", categories.len());
            let orchestrator = orchestrator::Orchestrator::from_config(&config)?;
            let results = match orchestrator.detect(&image, &types).await {
                Ok(results) => results,
                Err(e) => {
                    file.session_mut().abandon_run();
                    return Err(e.into());
                }
            };
            print_results(&results);
            println!();

            println!("[2/2] 結果をマージ中...");
            file.session_mut().complete_run(&results);
            file.save(&folder)?;
            println!("✔ セッション内の結果: {}カテゴリ", file.session().results().len());
        }

        Commands::Save { name, age, gender, contact, session, records } => {
            println!("💾 lesion-vision - レコード保存\n");
            let folder = session.unwrap_or_else(|| PathBuf::from("."));
            let file = session::SessionFile::load(&folder);

            let draft = file.session().to_draft(&PatientInfo { name, age, gender, contact })?;

            let dir = match records {
                Some(dir) => dir,
                None => config.records_dir()?,
            };
            let store = records::RecordStore::open(&dir)?;
            let record = store.save(&draft)?;

            println!("✔ 保存しました");
            println!("  ID: {}", record.id.as_deref().unwrap_or_default());
            println!("  保存先: {}", store.dir().display());
        }

        Commands::Report { id, output, format, pdf_quality, records } => {
            println!("📄 lesion-vision - レポート出力\n");

            let dir = match records {
                Some(dir) => dir,
                None => config.records_dir()?,
            };
            let store = records::RecordStore::open(&dir)?;
            let record = store
                .load(&id)
                .with_context(|| format!("レコードを読み込めません: {}", id))?;

            let inliner = inline::AssetInliner::new(timeout)?;
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            export::export_report(&record, &inliner, &format, &output, pdf_quality).await?;

            println!("\n✅ レポート出力完了");
        }

        Commands::Serve { bind, pdf_quality } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            println!("🌐 lesion-vision - APIサーバー ({})", config.bind);
            server::serve(&config, pdf_quality).await?;
        }

        Commands::Config { show } => {
            if show {
                println!("設定:");
                println!("  設定ファイル: {}", Config::config_path()?.display());
                for category in LesionCategory::ALL {
                    let address = config
                        .detectors
                        .get(&category)
                        .map(String::as_str)
                        .unwrap_or("未設定");
                    println!("  {} ({}): {}", category.display_name(), category.env_var(), address);
                }
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  発行方式: {:?}", config.dispatch);
                println!(
                    "  アップロード: {}",
                    if config.upload.cloud_name.is_some() && config.upload.upload_preset.is_some() {
                        "設定済み"
                    } else {
                        "未設定"
                    }
                );
                println!("  レコード保存先: {}", config.records_dir()?.display());
                println!("  バインド: {}", config.bind);
            } else {
                config.save()?;
                println!("✔ 設定ファイルを書き出しました: {}", Config::config_path()?.display());
            }
        }

        Commands::Session { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let session_path = session::SessionFile::session_path(&target);

            if info || !clear {
                if session_path.exists() {
                    let file = session::SessionFile::load(&target);
                    println!("セッション情報:");
                    println!("  パス: {}", session_path.display());
                    println!("  画像: {}", file.session().image_reference().unwrap_or("なし"));
                    println!("  結果: {}カテゴリ", file.session().results().len());
                    if session::RunLock::is_locked(&target) {
                        println!("  状態: 検出実行中（ロックあり）");
                    }
                } else {
                    println!("セッションファイルが存在しません: {}", session_path.display());
                }
            }

            if clear {
                match session::SessionFile::clear(&target) {
                    Ok(true) => println!("✔ セッションを削除しました: {}", session_path.display()),
                    Ok(false) => println!("セッションファイルが存在しません"),
                    Err(e) => println!("セッション削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_results(results: &DetectionAggregate) {
    for (category, outcome) in results {
        let status = match (outcome.succeeded, outcome.detected) {
            (false, _) => "失敗".to_string(),
            (true, false) => "検出なし".to_string(),
            (true, true) => format!(
                "検出 ({:.2}%)",
                outcome.confidence.unwrap_or_default()
            ),
        };
        println!("  {:<18} {}", category.display_name(), status);
    }
}
