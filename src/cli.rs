use clap::{Parser, Subcommand};
use lesion_vision_common::CategorySelection;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lesion-vision")]
#[command(about = "皮膚病変パターン検出・レポート生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 病変画像をアップロードしてセッションに登録
    Upload {
        /// 画像ファイル
        #[arg(required = true)]
        image: PathBuf,

        /// セッションフォルダ（省略時はカレント）
        #[arg(short, long)]
        session: Option<PathBuf>,
    },

    /// 検出を実行してセッションの結果にマージ
    Detect {
        /// 画像URL（省略時はセッションの画像）
        #[arg(short, long)]
        image: Option<String>,

        /// 検出カテゴリ (all / streaks,globules,...)
        #[arg(short, long, default_value = "all")]
        types: CategorySelection,

        /// セッションフォルダ（省略時はカレント）
        #[arg(short, long)]
        session: Option<PathBuf>,
    },

    /// セッションの結果を患者情報と共にレコードとして保存
    Save {
        /// 患者名
        #[arg(long)]
        name: String,

        /// 年齢
        #[arg(long)]
        age: Option<u32>,

        /// 性別
        #[arg(long)]
        gender: String,

        /// 連絡先
        #[arg(long, default_value = "")]
        contact: String,

        /// セッションフォルダ（省略時はカレント）
        #[arg(short, long)]
        session: Option<PathBuf>,

        /// レコード保存先（省略時は設定値）
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// 保存済みレコードからレポートを出力
    Report {
        /// レコードID
        #[arg(required = true)]
        id: String,

        /// 出力先（ファイルまたはフォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (pdf/json/both)
        #[arg(short, long, default_value = "pdf")]
        format: ExportFormat,

        /// PDF画像品質 (high/medium/low)
        #[arg(long, default_value = "medium")]
        pdf_quality: PdfQuality,

        /// レコード保存先（省略時は設定値）
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// HTTP APIサーバーを起動
    Serve {
        /// バインドアドレス（省略時は設定値）
        #[arg(short, long)]
        bind: Option<String>,

        /// PDF画像品質 (high/medium/low)
        #[arg(long, default_value = "medium")]
        pdf_quality: PdfQuality,
    },

    /// 設定を表示
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// セッション管理
    Session {
        /// セッションを削除
        #[arg(long)]
        clear: bool,

        /// 対象フォルダ（省略時はカレント）
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// セッション情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum ExportFormat {
    #[default]
    Pdf,
    Json,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "json" => Ok(ExportFormat::Json),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use pdf, json, or both", s)),
        }
    }
}

/// PDF画像品質設定
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PdfQuality {
    /// 高品質: 1400px
    High,
    /// 中品質: 800px（デフォルト）
    #[default]
    Medium,
    /// 低品質: 500px
    Low,
}

impl PdfQuality {
    /// 最大ピクセル幅
    pub fn max_width(&self) -> u32 {
        match self {
            PdfQuality::High => 1400,
            PdfQuality::Medium => 800,
            PdfQuality::Low => 500,
        }
    }
}

impl std::str::FromStr for PdfQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" | "h" => Ok(PdfQuality::High),
            "medium" | "med" | "m" => Ok(PdfQuality::Medium),
            "low" | "l" => Ok(PdfQuality::Low),
            _ => Err(format!("Unknown quality: {}. Use high, medium, or low", s)),
        }
    }
}

impl std::fmt::Display for PdfQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfQuality::High => write!(f, "high"),
            PdfQuality::Medium => write!(f, "medium"),
            PdfQuality::Low => write!(f, "low"),
        }
    }
}
