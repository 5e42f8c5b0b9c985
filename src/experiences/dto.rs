use serde::Deserialize;
use serde_json::json;

use super::listing::SortOrder;
use super::repo_types::{NewExperience, Verdict};
use crate::ids::RECORD_ID_LEN;
use crate::validation::{Field, Kind, RequestSchema, Rule, Schema, Shape};

/// `POST /experiences`
#[derive(Debug, Deserialize)]
pub struct CreateExperienceRequest {
    pub body: NewExperience,
}

impl RequestSchema for CreateExperienceRequest {
    fn schema() -> Schema {
        Schema::new().body(Shape::new([
            Field::string("company").trimmed().rule(Rule::MinLength(1)),
            Field::string("role").trimmed().rule(Rule::MinLength(1)),
            Field::integer("year")
                .rule(Rule::Min(1900))
                .rule(Rule::Max(3000)),
            Field::string("verdict")
                .rule(Rule::OneOf(Verdict::NAMES))
                .default(Verdict::default().as_str()),
            Field::array("rounds", Kind::String).default(json!([])),
            Field::array("problemLinks", Kind::String)
                .trimmed()
                .rule(Rule::Url)
                .default(json!([])),
            Field::string("tips").trimmed().default(""),
            Field::boolean("anonymous").default(false),
        ]))
    }
}

/// `GET /experiences`
#[derive(Debug, Deserialize)]
pub struct ListExperiencesRequest {
    pub query: ListParams,
}

/// Paging values stay text here; [`super::listing::ListQuery::from_raw`] parses them.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub company: Option<String>,
    pub role: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<SortOrder>,
}

impl RequestSchema for ListExperiencesRequest {
    fn schema() -> Schema {
        Schema::new().query(Shape::new([
            Field::string("company").trimmed().optional(),
            Field::string("role").trimmed().optional(),
            Field::string("page").optional(),
            Field::string("limit").optional(),
            Field::string("sort").rule(Rule::OneOf(SortOrder::NAMES)).optional(),
        ]))
    }
}

/// `GET /experiences/:id`
#[derive(Debug, Deserialize)]
pub struct GetExperienceRequest {
    pub params: IdParams,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: String,
}

impl RequestSchema for GetExperienceRequest {
    fn schema() -> Schema {
        Schema::new().params(Shape::new([Field::string("id")
            .rule(Rule::Length(RECORD_ID_LEN))
            .rule(Rule::Hex)]))
    }
}
