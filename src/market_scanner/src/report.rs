//! Chat message formatting.
//!
//! Messages keep the layout the alert bot has always used: a dated header,
//! one section per universe with a bullet per candidate, and a footer naming
//! the conditions. Instruments that could not be analysed are listed last.

use std::fmt::Write;

use chrono::NaiveDate;
use market_data::models::instrument::Universe;
use market_data::requests::batch::SkipRecord;
use market_data::universe::UniverseCatalog;
use signal_engine::candidate::Candidate;
use signal_engine::envelope::EnvelopeReport;

/// Skip entries listed before the rest is summarised as a count.
const MAX_LISTED_SKIPS: usize = 20;

/// Which screen a message reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Potential,
    Wave { weekly: bool },
}

impl ReportKind {
    fn header(self, date: NaiveDate) -> String {
        match self {
            ReportKind::Potential => format!("📊 {date} 급등주 포착 결과"),
            ReportKind::Wave { weekly: true } => format!("📈 {date} 파동 분석 결과 (주봉 기준)"),
            ReportKind::Wave { weekly: false } => format!("📈 {date} 파동 분석 결과 (일봉 기준)"),
        }
    }

    fn noun(self) -> &'static str {
        match self {
            ReportKind::Potential => "급등주",
            ReportKind::Wave { .. } => "파동주",
        }
    }

    fn footer(self) -> &'static str {
        match self {
            ReportKind::Potential => "조건: 거래량 급증, 단기/장기 이동평균 교차, 연속 상승",
            ReportKind::Wave { .. } => {
                "분석조건: 피보나치 되돌림, 볼린저 하단, RSI 과매도 반등, MACD 교차, 거래량 패턴"
            }
        }
    }
}

/// Display labels of both universes.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseLabels {
    pub primary: String,
    pub secondary: String,
}

impl Default for UniverseLabels {
    fn default() -> Self {
        Self {
            primary: Universe::Primary.default_label().to_string(),
            secondary: Universe::Secondary.default_label().to_string(),
        }
    }
}

impl UniverseLabels {
    pub fn from_catalog(catalog: &UniverseCatalog) -> Self {
        Self {
            primary: catalog.label(Universe::Primary),
            secondary: catalog.label(Universe::Secondary),
        }
    }

    pub fn get(&self, universe: Universe) -> &str {
        match universe {
            Universe::Primary => &self.primary,
            Universe::Secondary => &self.secondary,
        }
    }
}

fn section_marker(universe: Universe) -> &'static str {
    match universe {
        Universe::Primary => "🔵",
        Universe::Secondary => "🔴",
    }
}

/// Formats a price as whole won with thousands separators (e.g. `71,500`).
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One bullet line for a candidate.
pub fn candidate_line(candidate: &Candidate) -> String {
    let inst = &candidate.instrument;
    let change = candidate
        .change_rate
        .map(|r| format!("{r:+.2}%"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "• {} ({}): {}원 ({}) [{:.2}] - {}",
        inst.name,
        inst.code,
        format_price(candidate.close),
        change,
        candidate.score,
        candidate.detail.summary()
    )
}

/// Formats the potential or wave message from aggregated candidates.
///
/// Candidates keep their incoming order inside each universe section.
pub fn format_screen(
    kind: ReportKind,
    date: NaiveDate,
    candidates: &[Candidate],
    labels: &UniverseLabels,
    skipped: &[SkipRecord],
) -> String {
    let mut msg = String::new();

    if candidates.is_empty() {
        let _ = writeln!(msg, "오늘 조건에 맞는 {}가 없습니다.", kind.noun());
    } else {
        let _ = writeln!(msg, "{}\n", kind.header(date));
        for universe in Universe::ALL {
            let lines: Vec<String> = candidates
                .iter()
                .filter(|c| c.instrument.universe == universe)
                .map(candidate_line)
                .collect();
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(
                msg,
                "{} {} {}:",
                section_marker(universe),
                labels.get(universe),
                kind.noun()
            );
            for line in lines {
                let _ = writeln!(msg, "{line}");
            }
            msg.push('\n');
        }
        let _ = writeln!(msg, "{}", kind.footer());
    }

    if !skipped.is_empty() {
        msg.push_str(&format_skips(skipped));
    }
    msg.trim_end().to_string()
}

/// Lists skipped instruments with their reason.
pub fn format_skips(skipped: &[SkipRecord]) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "\n⚠️ 분석 제외 {}종목:", skipped.len());
    for record in skipped.iter().take(MAX_LISTED_SKIPS) {
        let _ = writeln!(msg, "• {} ({}): {}", record.name, record.code, record.reason);
    }
    if skipped.len() > MAX_LISTED_SKIPS {
        let _ = writeln!(msg, "… 외 {}종목", skipped.len() - MAX_LISTED_SKIPS);
    }
    msg
}

/// Formats the envelope recommendation.
pub fn format_envelope(report: &EnvelopeReport, sma_window: usize, envelope_pct: f64) -> String {
    let sym = &report.symbol;
    let pct = (envelope_pct * 100.0).round();
    let mut msg = String::new();
    let _ = writeln!(msg, "{sym} {sma_window}일선 차트 ({})", report.date);
    let _ = writeln!(msg, "{sym} 종가: {:.2}", report.close);
    let _ = writeln!(msg, "{sma_window}일선: {:.2}", report.sma);
    let _ = writeln!(msg, "{pct:.0}%엔벨로프선: {:.2}", report.envelope);
    let _ = writeln!(msg, "차이: {:.2}", report.diff());
    let _ = write!(msg, "결과 - {} 구매 추천", report.recommendation);
    msg
}

/// Message sent when the envelope analysis could not run.
pub fn format_envelope_failure(symbol: &str, reason: &str) -> String {
    format!("{symbol} 데이터를 가져오는데 실패했습니다. ({reason})")
}

#[cfg(test)]
mod tests {
    use market_data::models::instrument::Instrument;
    use market_data::requests::batch::SkipReason;
    use signal_engine::candidate::{
        CandidateCategory, CandidateDetail, ScreenMetrics, ScreenRule,
    };
    use signal_engine::envelope::Recommendation;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    fn candidate(code: &str, name: &str, universe: Universe, close: f64, score: f64) -> Candidate {
        Candidate {
            instrument: Instrument::new(code, name, universe),
            date: date(),
            category: CandidateCategory::VolumeSurge,
            score,
            close,
            change_rate: Some(3.456),
            detail: CandidateDetail::Screen {
                matched: vec![ScreenRule::VolumeSurge],
                metrics: ScreenMetrics::default(),
            },
        }
    }

    #[test]
    fn price_grouping() {
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(71500.0), "71,500");
        assert_eq!(format_price(1234567.4), "1,234,567");
        assert_eq!(format_price(-1500.0), "-1,500");
    }

    #[test]
    fn candidate_line_layout() {
        let c = candidate("005930", "삼성전자", Universe::Primary, 71500.0, 0.666);
        assert_eq!(
            candidate_line(&c),
            "• 삼성전자 (005930): 71,500원 (+3.46%) [0.67] - volume surge"
        );
    }

    #[test]
    fn sections_per_universe() {
        let candidates = vec![
            candidate("005930", "삼성전자", Universe::Primary, 71500.0, 1.0),
            candidate("247540", "에코프로비엠", Universe::Secondary, 250000.0, 0.5),
        ];
        let msg = format_screen(
            ReportKind::Potential,
            date(),
            &candidates,
            &UniverseLabels::default(),
            &[],
        );
        assert!(msg.starts_with("📊 2025-03-07 급등주 포착 결과"));
        let kospi = msg.find("🔵 KOSPI 급등주:").unwrap();
        let kosdaq = msg.find("🔴 KOSDAQ 급등주:").unwrap();
        assert!(kospi < kosdaq);
        assert!(msg.contains("에코프로비엠 (247540): 250,000원"));
        assert!(msg.ends_with("연속 상승"));
        assert!(!msg.contains("분석 제외"));
    }

    #[test]
    fn empty_universe_section_is_omitted() {
        let candidates = vec![candidate("247540", "에코프로비엠", Universe::Secondary, 1.0, 0.5)];
        let msg = format_screen(
            ReportKind::Wave { weekly: true },
            date(),
            &candidates,
            &UniverseLabels::default(),
            &[],
        );
        assert!(msg.contains("(주봉 기준)"));
        assert!(!msg.contains("KOSPI"));
        assert!(msg.contains("🔴 KOSDAQ 파동주:"));
    }

    #[test]
    fn no_candidates_still_lists_skips() {
        let inst = Instrument::new("000020", "동화약품", Universe::Primary);
        let skipped = vec![SkipRecord::new(
            &inst,
            SkipReason::InsufficientHistory {
                available: 10,
                required: 52,
            },
        )];
        let msg = format_screen(
            ReportKind::Wave { weekly: true },
            date(),
            &[],
            &UniverseLabels::default(),
            &skipped,
        );
        assert!(msg.starts_with("오늘 조건에 맞는 파동주가 없습니다."));
        assert!(msg.contains("분석 제외 1종목"));
        assert!(msg.contains("동화약품 (000020): insufficient history (10/52 bars)"));
    }

    #[test]
    fn long_skip_list_is_truncated() {
        let skipped: Vec<_> = (0..25)
            .map(|i| {
                let inst = Instrument::new(format!("{i:06}"), "X", Universe::Primary);
                SkipRecord::new(&inst, SkipReason::UnknownInstrument)
            })
            .collect();
        let msg = format_skips(&skipped);
        assert_eq!(msg.matches("unknown instrument").count(), MAX_LISTED_SKIPS);
        assert!(msg.contains("… 외 5종목"));
    }

    #[test]
    fn envelope_message() {
        let report = EnvelopeReport {
            symbol: "TQQQ".to_string(),
            date: date(),
            close: 75.5,
            sma: 70.0,
            envelope: 77.0,
            change_rate: None,
            recommendation: Recommendation::Tqqq,
        };
        let msg = format_envelope(&report, 200, 0.10);
        let lines: Vec<_> = msg.lines().collect();
        assert_eq!(lines[0], "TQQQ 200일선 차트 (2025-03-07)");
        assert_eq!(lines[1], "TQQQ 종가: 75.50");
        assert_eq!(lines[2], "200일선: 70.00");
        assert_eq!(lines[3], "10%엔벨로프선: 77.00");
        assert_eq!(lines[4], "차이: 5.50");
        assert_eq!(lines[5], "결과 - TQQQ 구매 추천");
    }
}
