// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use derive_more::Deref;
use serde::{Deserialize, Serialize};

use super::{
    hit_id_desc, score_desc, title_match, BoolQuery, CatalogAggregation, HIT_ID_PROJECTION,
};

/// Painless script returning the weight of the document's category, 0 if unknown.
///
/// [`category_match_score`] implements the same contract in process.
pub const CATEGORY_MATCH_SCRIPT: &str = "\
if (!doc.containsKey('fast_text_category_name') || doc['fast_text_category_name'].empty) {
    return 0.0;
}
if (!params.containsKey('category_weights') || params.category_weights == null || params.category_weights.empty) {
    return 0.0;
}
def category = doc['fast_text_category_name'].value;
if (params.category_weights.containsKey(category)) {
    return params.category_weights[category];
}
return 0.0;
";

const CATEGORY_MATCH_WEIGHT: u32 = 100;

/// Boost per category label, keyed by label in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryWeights(pub BTreeMap<String, f64>);

impl CategoryWeights {
    pub fn weight(&self, category: &str) -> Option<f64> {
        self.0.get(category).copied()
    }
}

impl FromIterator<(String, f64)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What [`CATEGORY_MATCH_SCRIPT`] computes for a document.
pub fn category_match_score(category: Option<&str>, weights: Option<&CategoryWeights>) -> f64 {
    match (category, weights) {
        (Some(category), Some(weights)) => weights.weight(category).unwrap_or(0.),
        _ => 0.,
    }
}

/// How hits are ranked once the category weight is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Category weight replaces the relevance, ties are broken by the hit id.
    IdSort,
    /// Category weight plus a per request random score.
    RandomSort,
    /// Category weight on top of the relevance.
    Bm25Sort,
}

impl SortMode {
    pub fn name(self) -> &'static str {
        match self {
            SortMode::IdSort => "idsort",
            SortMode::RandomSort => "randomsort",
            SortMode::Bm25Sort => "bm25sort",
        }
    }

    pub fn boost_mode(self) -> BoostMode {
        match self {
            SortMode::IdSort => BoostMode::Replace,
            SortMode::RandomSort | SortMode::Bm25Sort => BoostMode::Sum,
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatchQuery<'a> {
    #[serde(skip)]
    pub sort_mode: SortMode,
    pub query: FunctionScoreQuery<'a>,
    #[serde(rename = "_source")]
    pub source: &'static [&'static str],
    pub aggs: CatalogAggregation<'a>,
    pub size: usize,
}

pub fn category_match<'a>(
    keyword: &'a str,
    weights: &'a CategoryWeights,
    sort_mode: SortMode,
) -> CategoryMatchQuery<'a> {
    let script = Script::category_match(weights);

    // Only bm25sort keeps the text relevance, the other modes only use the match to select hits.
    let query = match sort_mode {
        SortMode::Bm25Sort => BoolQuery::default()
            .with_must(title_match(keyword))
            .with_product_filters(),
        SortMode::IdSort | SortMode::RandomSort => BoolQuery::default()
            .with_product_filters()
            .with_filter(title_match(keyword)),
    };

    let mut functions = vec![ScoreFunction::Script {
        weight: CATEGORY_MATCH_WEIGHT,
        script_score: ScriptScore {
            script: script.clone(),
        },
    }];
    if sort_mode == SortMode::RandomSort {
        functions.push(ScoreFunction::Random {
            random_score: RandomScore {},
        });
    }

    let sort = match sort_mode {
        SortMode::Bm25Sort => vec![score_desc()],
        SortMode::IdSort | SortMode::RandomSort => vec![score_desc(), hit_id_desc()],
    };

    CategoryMatchQuery {
        sort_mode,
        query: FunctionScoreQuery {
            function_score: FunctionScore {
                boost_mode: sort_mode.boost_mode(),
                query,
                functions,
                score_mode: ScoreMode::Sum,
            },
        },
        source: HIT_ID_PROJECTION,
        aggs: CatalogAggregation::new(
            sort,
            Some(ScriptFields {
                fast_text_category_match: ScriptField { script },
            }),
        ),
        size: 1,
    }
}

impl<'a> From<CategoryMatchQuery<'a>> for super::SearchBody<'a> {
    fn from(query: CategoryMatchQuery<'a>) -> Self {
        super::SearchBody::CategoryMatch(query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionScoreQuery<'a> {
    pub function_score: FunctionScore<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionScore<'a> {
    pub boost_mode: BoostMode,
    pub query: BoolQuery<'a>,
    pub functions: Vec<ScoreFunction<'a>>,
    pub score_mode: ScoreMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostMode {
    Sum,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScoreFunction<'a> {
    Script {
        weight: u32,
        script_score: ScriptScore<'a>,
    },
    Random {
        random_score: RandomScore,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptScore<'a> {
    pub script: Script<'a>,
}

/// Serializes as `{}`, the engine picks a fresh seed per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RandomScore {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script<'a> {
    pub source: &'static str,
    pub params: ScriptParams<'a>,
}

impl<'a> Script<'a> {
    fn category_match(category_weights: &'a CategoryWeights) -> Self {
        Self {
            source: CATEGORY_MATCH_SCRIPT,
            params: ScriptParams { category_weights },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptParams<'a> {
    pub category_weights: &'a CategoryWeights,
}

/// Computed fields attached to every top hit for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptFields<'a> {
    pub fast_text_category_match: ScriptField<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptField<'a> {
    pub script: Script<'a>,
}
