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

//! Request bodies for the catalog product index.
//!
//! Every query shape is its own type which serializes into exactly the body sent to the
//! search engine. Field order and map key order are fixed, so two bodies built from the
//! same inputs serialize to the same bytes.

mod category;

use derive_more::{Deref, DerefMut};
use serde::{ser::SerializeMap, Serialize, Serializer};

pub use self::category::{
    category_match, category_match_score, BoostMode, CategoryMatchQuery, CategoryWeights,
    FunctionScore, FunctionScoreQuery, RandomScore, ScoreFunction, ScoreMode, Script,
    ScriptField, ScriptFields, ScriptParams, ScriptScore, SortMode, CATEGORY_MATCH_SCRIPT,
};
use crate::distribution::CatalogId;

pub const TITLE_FIELD: &str = "serving_title";
pub const CATALOG_ID_FIELD: &str = "catalog_id";
pub const CATALOG_PRODUCT_SET_IDS_FIELD: &str = "catalog_product_set_ids";
pub const AVAILABILITY_FIELD: &str = "availability";
pub const IN_STOCK: &str = "IN_STOCK";
pub const HIT_ID_FIELD: &str = "original_id";
pub const CATEGORY_FIELD: &str = "fast_text_category_name";

const HIT_ID_PROJECTION: &[&str] = &[HIT_ID_FIELD];

/// Fields returned for every product hit.
pub const PRODUCT_PROJECTION: &[&str] = &[
    HIT_ID_FIELD,
    "product_id",
    CATALOG_ID_FIELD,
    "title",
    "brand_name",
    "image_url",
    "landing_url",
    "price",
    "sale_price",
    CATALOG_PRODUCT_SET_IDS_FIELD,
    "sale_price_effective_date_from",
    "sale_price_effective_date_to",
    CATEGORY_FIELD,
];

const CATALOG_GROUPS: usize = 1000;
const HITS_PER_CATALOG: usize = 10;
const MAX_TERMS_HITS: usize = 1000;

/// Any of the request bodies, as handed to a search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchBody<'a> {
    Current(CurrentQuery<'a>),
    Terms(TermsQuery<'a>),
    CategoryMatch(CategoryMatchQuery<'a>),
}

impl SearchBody<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SearchBody::Current(_) => "asis",
            SearchBody::Terms(_) => "terms",
            SearchBody::CategoryMatch(query) => query.sort_mode.name(),
        }
    }
}

/// The query currently serving the ads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentQuery<'a> {
    pub query: BoolQuery<'a>,
    #[serde(rename = "_source")]
    pub source: &'static [&'static str],
    pub aggs: CatalogAggregation<'a>,
    pub size: usize,
}

pub fn current(keyword: &str) -> CurrentQuery<'_> {
    CurrentQuery {
        query: BoolQuery::default()
            .with_must(title_match(keyword))
            .with_product_filters(),
        source: HIT_ID_PROJECTION,
        aggs: CatalogAggregation::new(vec![score_desc()], None),
        size: 1,
    }
}

impl<'a> From<CurrentQuery<'a>> for SearchBody<'a> {
    fn from(query: CurrentQuery<'a>) -> Self {
        SearchBody::Current(query)
    }
}

/// Raw hits restricted to a set of catalogs, without any grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsQuery<'a> {
    pub query: BoolQuery<'a>,
    #[serde(rename = "_source")]
    pub source: &'static [&'static str],
    pub size: usize,
}

pub fn terms<'a>(keyword: &'a str, catalog_ids: &'a [CatalogId]) -> TermsQuery<'a> {
    TermsQuery {
        query: BoolQuery::default()
            .with_must(title_match(keyword))
            .with_product_filters()
            .with_filter(Clause::Terms(Field::new(CATALOG_ID_FIELD, catalog_ids))),
        source: PRODUCT_PROJECTION,
        size: MAX_TERMS_HITS,
    }
}

impl<'a> From<TermsQuery<'a>> for SearchBody<'a> {
    fn from(query: TermsQuery<'a>) -> Self {
        SearchBody::Terms(query)
    }
}

/// Serializes as a single entry map `{ name: value }`, the way the query DSL names fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    pub name: &'static str,
    pub value: T,
}

impl<T> Field<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self { name, value }
    }
}

impl<T> Serialize for Field<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.name, &self.value)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut, Serialize)]
pub struct BoolQuery<'a> {
    pub bool: BoolClauses<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolClauses<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause<'a>>,
    pub filter: Vec<Clause<'a>>,
}

impl<'a> BoolQuery<'a> {
    fn with_must(mut self, clause: Clause<'a>) -> Self {
        self.must.push(clause);
        self
    }

    fn with_filter(mut self, clause: Clause<'a>) -> Self {
        self.filter.push(clause);
        self
    }

    /// Only products which are in stock and exposed under a catalog can be shown as ads.
    fn with_product_filters(self) -> Self {
        self.with_filter(Clause::Exists {
            field: CATALOG_PRODUCT_SET_IDS_FIELD,
        })
        .with_filter(Clause::Term(Field::new(
            AVAILABILITY_FIELD,
            TermValue { value: IN_STOCK },
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause<'a> {
    Match(Field<TextMatch<'a>>),
    Exists { field: &'static str },
    Term(Field<TermValue>),
    Terms(Field<&'a [CatalogId]>),
}

fn title_match(keyword: &str) -> Clause<'_> {
    Clause::Match(Field::new(
        TITLE_FIELD,
        TextMatch {
            query: keyword,
            operator: Operator::And,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMatch<'a> {
    pub query: &'a str,
    pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermValue {
    pub value: &'static str,
}

/// Groups the hits by catalog and keeps the best hits of every catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogAggregation<'a> {
    pub by_catalog_id: CatalogGroups<'a>,
}

impl<'a> CatalogAggregation<'a> {
    fn new(sort: Vec<Field<SortOrder>>, script_fields: Option<ScriptFields<'a>>) -> Self {
        Self {
            by_catalog_id: CatalogGroups {
                terms: TermsAggregation {
                    field: CATALOG_ID_FIELD,
                    size: CATALOG_GROUPS,
                },
                aggs: TopCatalogHits {
                    top_catalog_hits: TopHitsAggregation {
                        top_hits: TopHits {
                            sort,
                            source: PRODUCT_PROJECTION,
                            size: HITS_PER_CATALOG,
                            script_fields,
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogGroups<'a> {
    pub terms: TermsAggregation,
    pub aggs: TopCatalogHits<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsAggregation {
    pub field: &'static str,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCatalogHits<'a> {
    pub top_catalog_hits: TopHitsAggregation<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHitsAggregation<'a> {
    pub top_hits: TopHits<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHits<'a> {
    pub sort: Vec<Field<SortOrder>>,
    #[serde(rename = "_source")]
    pub source: &'static [&'static str],
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_fields: Option<ScriptFields<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    pub order: Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Desc,
}

fn score_desc() -> Field<SortOrder> {
    Field::new(
        "_score",
        SortOrder {
            order: Order::Desc,
        },
    )
}

fn hit_id_desc() -> Field<SortOrder> {
    Field::new(
        HIT_ID_FIELD,
        SortOrder {
            order: Order::Desc,
        },
    )
}
