use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vin_scan_common::{FilterOption, ResponseContract};

#[derive(Parser)]
#[command(name = "vin-scan")]
#[command(about = "車両書類（VINプレート・整備ステッカー）撮影・認識ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 認識サーバーのURL（設定ファイルより優先）
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    /// レスポンス形式 (fields/legacy-vin)
    #[arg(long, global = true)]
    pub contract: Option<ResponseContract>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 対話式で撮影・送信・結果表示を行う
    Scan {
        /// 撮影画像として使うファイル（省略時は撮影フォルダの最新画像）
        #[arg(short, long, conflicts_with = "source_dir")]
        image: Option<PathBuf>,

        /// 撮影フォルダ（設定の capture_dir より優先）
        #[arg(short = 'd', long)]
        source_dir: Option<PathBuf>,

        /// 撮影後に選択しておくフィルタ（複数指定可）
        #[arg(short, long = "filter")]
        filters: Vec<FilterOption>,

        /// 撮影フォルダへのアクセスを確認なしで許可
        #[arg(short, long)]
        yes: bool,
    },

    /// 画像を1枚送信して結果を表示
    Upload {
        /// 画像ファイル
        #[arg(required = true)]
        image: PathBuf,

        /// フィルタ（複数指定可）
        #[arg(short, long = "filter")]
        filters: Vec<FilterOption>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 選択可能なフィルタを一覧表示
    Filters,

    /// 設定を表示/編集
    Config {
        /// サーバーURLを設定
        #[arg(long)]
        set_server_url: Option<String>,

        /// レスポンス形式を設定 (fields/legacy-vin)
        #[arg(long)]
        set_contract: Option<ResponseContract>,

        /// タイムアウト秒数を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 撮影フォルダを設定
        #[arg(long)]
        set_capture_dir: Option<PathBuf>,

        /// 撮影フォルダへのアクセス許可を取り消す
        #[arg(long)]
        revoke_camera_access: bool,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
