//! The subset of the OpenAPI 3.x object model the contract understands.

use std::collections::BTreeMap;

use http::Method;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct OpenApiDocument {
    pub openapi: String,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    pub components: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PathItem {
    #[serde(default)]
    pub parameters: Vec<ParameterObject>,
    pub get: Option<OperationObject>,
    pub put: Option<OperationObject>,
    pub post: Option<OperationObject>,
    pub delete: Option<OperationObject>,
    pub patch: Option<OperationObject>,
    pub head: Option<OperationObject>,
    pub options: Option<OperationObject>,
}

impl PathItem {
    pub fn operations(&self) -> impl Iterator<Item = (Method, &OperationObject)> {
        [
            (Method::GET, self.get.as_ref()),
            (Method::PUT, self.put.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::DELETE, self.delete.as_ref()),
            (Method::PATCH, self.patch.as_ref()),
            (Method::HEAD, self.head.as_ref()),
            (Method::OPTIONS, self.options.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationObject {
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterObject>,
    pub request_body: Option<RequestBodyObject>,
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ParameterObject {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestBodyObject {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: BTreeMap<String, MediaTypeObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseObject {
    #[serde(default)]
    pub content: BTreeMap<String, MediaTypeObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaTypeObject {
    pub schema: Option<Value>,
}
