//! マス別平均評価値テーブルの生成
//!
//! 評価値ダンプ（JSONL）を並列に集計し、駒数で分類した
//! `(駒, マス)` ごとの平均評価値を JSON 配列として書き出す。

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use evalmap_core::{
    AggregateConfig, FileSource, JsonFileSink, LogProgress, NoProgress, ProgressReporter,
    ScoreSelection, run,
};
use tools::common::{BarProgress, load_config};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelectionArg {
    /// 全読み筋の平均
    Mean,
    /// 手番側の最善値
    Best,
}

impl From<SelectionArg> for ScoreSelection {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::Mean => ScoreSelection::Mean,
            SelectionArg::Best => ScoreSelection::Best,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "build_luts")]
#[command(about = "評価値ダンプから駒数別・マス別の平均評価値テーブルを作る")]
struct Cli {
    /// 入力 JSONL（非圧縮）
    #[arg(long, default_value = "lichess_db_eval.jsonl")]
    input: PathBuf,

    /// 出力先（`-` で標準出力、`.gz` で gzip）
    #[arg(short, long, default_value = "./boards.json")]
    output: PathBuf,

    /// TOML 設定ファイル（コマンドライン引数が優先）
    #[arg(long)]
    config: Option<PathBuf>,

    /// ワーカー数（未指定時: 並列度 - 1）
    #[arg(long)]
    workers: Option<usize>,

    /// 詰み読みも換算して集計する
    #[arg(long, default_value_t = false)]
    include_mate: bool,

    /// 局面の代表値
    #[arg(long, value_enum)]
    selection: Option<SelectionArg>,

    #[arg(long)]
    min_enemies: Option<usize>,

    #[arg(long)]
    max_enemies: Option<usize>,

    #[arg(long)]
    min_pieces: Option<usize>,

    #[arg(long)]
    max_pieces: Option<usize>,

    /// 進捗表示を無効化
    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

impl Cli {
    /// 指定された引数で設定を上書き
    fn apply(&self, config: &mut AggregateConfig) {
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.include_mate {
            config.mate.ignore = false;
        }
        if let Some(selection) = self.selection {
            config.selection = selection.into();
        }
        if let Some(n) = self.min_enemies {
            config.bounds.min_enemy = n;
        }
        if let Some(n) = self.max_enemies {
            config.bounds.max_enemy = n;
        }
        if let Some(n) = self.min_pieces {
            config.bounds.min_piece = n;
        }
        if let Some(n) = self.max_pieces {
            config.bounds.max_piece = n;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let source = FileSource::new(&cli.input)
        .with_context(|| format!("failed to open input {}", cli.input.display()))?;
    let mut sink = JsonFileSink::new(&cli.output);

    let bars;
    let log_progress = LogProgress::new();
    let progress: &dyn ProgressReporter = if cli.no_progress {
        &NoProgress
    } else if std::io::stderr().is_terminal() {
        bars = BarProgress::new().context("invalid progress bar template")?;
        &bars
    } else {
        &log_progress
    };

    let started = Instant::now();
    let summary = run(&config, &source, &mut sink, progress)
        .with_context(|| format!("failed to build tables from {}", cli.input.display()))?;

    let total = summary.total();
    log::info!(
        "Done in {:.1}s: {} records, {} positions ({} out of bounds, {} without evaluation)",
        started.elapsed().as_secs_f64(),
        total.records,
        summary.positions,
        total.skipped_bounds,
        total.skipped_no_eval,
    );
    log::info!("Wrote {} entries to {}", summary.entries, cli.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "build_luts",
            "--workers",
            "3",
            "--include-mate",
            "--selection",
            "best",
            "--max-pieces",
            "12",
        ]);
        let mut config = AggregateConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.workers, Some(3));
        assert!(!config.mate.ignore);
        assert_eq!(config.selection, ScoreSelection::Best);
        assert_eq!(config.bounds.max_piece, 12);
        assert_eq!(config.bounds.min_piece, 3);
        assert_eq!(cli.output, PathBuf::from("./boards.json"));
        assert_eq!(cli.input, PathBuf::from("lichess_db_eval.jsonl"));
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let cli = Cli::parse_from(["build_luts"]);
        let mut config = AggregateConfig {
            workers: Some(5),
            selection: ScoreSelection::Best,
            ..Default::default()
        };
        cli.apply(&mut config);
        assert_eq!(config.workers, Some(5));
        assert_eq!(config.selection, ScoreSelection::Best);
        assert!(config.mate.ignore);
    }
}
