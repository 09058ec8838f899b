use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;
use crate::record::QuoteRecord;
use crate::types::{InsurerId, Location, Month};

/// Owner age bracket used by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBracket {
    Young,
    Adult,
    Senior,
}

impl AgeBracket {
    pub fn of(age: i32) -> Self {
        match age {
            ..=24 => AgeBracket::Young,
            25..=65 => AgeBracket::Adult,
            _ => AgeBracket::Senior,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeBracket::Young => "18-24",
            AgeBracket::Adult => "25-65",
            AgeBracket::Senior => "65+",
        }
    }
}

/// Vehicle age bracket used by the analysis; five-year steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CarAgeBracket {
    Below5,
    From5To10,
    From10To15,
    From15To20,
    From20To25,
    Above25,
}

impl CarAgeBracket {
    pub fn of(age: i32) -> Self {
        match age {
            ..5 => CarAgeBracket::Below5,
            5..10 => CarAgeBracket::From5To10,
            10..15 => CarAgeBracket::From10To15,
            15..20 => CarAgeBracket::From15To20,
            20..25 => CarAgeBracket::From20To25,
            _ => CarAgeBracket::Above25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CarAgeBracket::Below5 => "Below 5 years",
            CarAgeBracket::From5To10 => "5 to 10 years",
            CarAgeBracket::From10To15 => "10 to 15 years",
            CarAgeBracket::From15To20 => "15 to 20 years",
            CarAgeBracket::From20To25 => "20 to 25 years",
            CarAgeBracket::Above25 => "Above 25 years",
        }
    }
}

/// The categorical dimension a price is grouped under besides its insurer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bracket {
    All,
    Age(AgeBracket),
    CarAge(CarAgeBracket),
    Location(Location),
    Month(Month),
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bracket::All => f.write_str("all"),
            Bracket::Age(b) => f.write_str(b.label()),
            Bracket::CarAge(b) => f.write_str(b.label()),
            Bracket::Location(l) => write!(f, "{l}"),
            Bracket::Month(m) => write!(f, "{m}"),
        }
    }
}

/// Bracket first so that sorted keys come out panel by panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub bracket: Bracket,
    pub insurer: InsurerId,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bracket {
            Bracket::All => write!(f, "{}", self.insurer),
            bracket => write!(f, "{}/{bracket}", self.insurer),
        }
    }
}

/// The five analysis breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Breakdown {
    Insurer,
    Age,
    CarAge,
    Location,
    Month,
}

impl Breakdown {
    pub const ALL: [Breakdown; 5] =
        [Breakdown::Insurer, Breakdown::Age, Breakdown::CarAge, Breakdown::Location, Breakdown::Month];

    pub fn name(self) -> &'static str {
        match self {
            Breakdown::Insurer => "insurer",
            Breakdown::Age => "insurer x age bracket",
            Breakdown::CarAge => "insurer x car age bracket",
            Breakdown::Location => "insurer x location",
            Breakdown::Month => "insurer x month",
        }
    }

    pub fn bracket_of(self, record: &QuoteRecord) -> Bracket {
        match self {
            Breakdown::Insurer => Bracket::All,
            Breakdown::Age => Bracket::Age(AgeBracket::of(record.owner_age())),
            Breakdown::CarAge => Bracket::CarAge(CarAgeBracket::of(record.vehicle_age())),
            Breakdown::Location => Bracket::Location(record.location()),
            Breakdown::Month => Bracket::Month(record.month()),
        }
    }

    /// Flatten records into one `(key, price)` pair per priced insurer.
    pub fn pairs(self, records: &[QuoteRecord]) -> impl Iterator<Item = (GroupKey, f64)> + '_ {
        records.iter().flat_map(move |record| {
            let bracket = self.bracket_of(record);
            record
                .prices()
                .iter()
                .map(move |p| (GroupKey { bracket, insurer: p.insurer_id }, p.total_amount))
        })
    }

    pub fn aggregate(self, records: &[QuoteRecord]) -> Vec<AggregateGroup<GroupKey>> {
        aggregate(self.pairs(records))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

impl GroupStats {
    /// Statistics over ascending `sorted` prices.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let count = sorted.len();
        Some(GroupStats {
            count,
            avg: sorted.iter().sum::<f64>() / count as f64,
            min,
            max,
            p25: percentile(sorted, 0.25)?,
            median: percentile(sorted, 0.50)?,
            p75: percentile(sorted, 0.75)?,
        })
    }
}

/// Prices sharing one key, ascending, with their statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateGroup<K> {
    pub key: K,
    pub prices: Vec<f64>,
    pub stats: GroupStats,
}

/// Position of the `p`-th percentile: `ceil(p × count)` into the ascending
/// list, without interpolation. Can equal `count`.
pub fn percentile_index(p: f64, count: usize) -> usize {
    (p * count as f64).ceil() as usize
}

/// The sample at [`percentile_index`], failing when it lies past the end.
pub fn percentile_strict(sorted: &[f64], p: f64) -> Result<f64, Error> {
    let index = percentile_index(p, sorted.len());
    sorted.get(index).copied().ok_or(Error::IndexOutOfRange { index, count: sorted.len() })
}

/// The sample at [`percentile_index`], clamped to the last sample.
/// `None` only for an empty list.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    percentile_strict(sorted, p).ok().or_else(|| sorted.last().copied())
}

/// Group `(key, price)` pairs by exact key equality. Groups come out in key
/// order with prices sorted ascending.
pub fn aggregate<K: Ord + fmt::Debug>(pairs: impl IntoIterator<Item = (K, f64)>) -> Vec<AggregateGroup<K>> {
    let mut grouped: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (key, price) in pairs {
        grouped.entry(key).or_default().push(price);
    }

    grouped
        .into_iter()
        .filter_map(|(key, mut prices)| {
            prices.sort_by(f64::total_cmp);
            match GroupStats::from_sorted(&prices).ok_or_else(|| Error::empty_group(format!("{key:?}"))) {
                Ok(stats) => Some(AggregateGroup { key, prices, stats }),
                Err(e) => {
                    tracing::warn!("skipping group: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Split key-ordered groups into consecutive runs sharing a bracket.
pub fn panels(groups: &[AggregateGroup<GroupKey>]) -> Vec<(Bracket, Vec<&AggregateGroup<GroupKey>>)> {
    let mut out: Vec<(Bracket, Vec<&AggregateGroup<GroupKey>>)> = Vec::new();
    for g in groups {
        match out.last_mut() {
            Some((bracket, members)) if *bracket == g.key.bracket => members.push(g),
            _ => out.push((g.key.bracket, vec![g])),
        }
    }
    out
}
