// Catalog module: product records in the document store.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::ApiClient;
use crate::error::{AdminError, Result};

/// Documents fetched per list call.
const PAGE_SIZE: u32 = 300;

/// A product as far as image migration cares: the position of each image in
/// `images` is meaningful and is preserved by every rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub images: Vec<String>,
}

pub trait Catalog {
    fn list_products(&self) -> Result<Vec<Product>>;
    fn get_product(&self, id: &str) -> Result<Option<Product>>;
    /// Replace the product's whole image sequence.
    fn update_images(&self, id: &str, images: &[String]) -> Result<()>;
}

#[derive(Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct ImagesPatch {
    fields: Map<String, Value>,
}

impl TryFrom<Document> for Product {
    type Error = AdminError;

    fn try_from(doc: Document) -> Result<Self> {
        let id = doc
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let name = doc
            .fields
            .get("name")
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let images = match doc.fields.get("images") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) if v.get("nullValue").is_some() => Vec::new(),
            Some(v) => decode_string_array(v).ok_or_else(|| {
                AdminError::Decode(format!("product {id}: images is not an array of strings"))
            })?,
        };
        Ok(Product { id, name, images })
    }
}

/// `{"arrayValue": {"values": [{"stringValue": ..}, ..]}}` into strings.
/// An empty array may omit `values` entirely.
fn decode_string_array(v: &Value) -> Option<Vec<String>> {
    let array = v.get("arrayValue")?;
    let Some(values) = array.get("values") else {
        return Some(Vec::new());
    };
    values
        .as_array()?
        .iter()
        .map(|item| item.get("stringValue").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn encode_string_array(items: &[String]) -> Value {
    let values: Vec<Value> = items.iter().map(|s| json!({ "stringValue": s })).collect();
    json!({ "arrayValue": { "values": values } })
}

impl ApiClient {
    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.endpoints().firestore,
            self.project_id(),
            self.refs().collection
        )
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.documents_url(), urlencoding::encode(id))
    }
}

impl Catalog for ApiClient {
    fn list_products(&self) -> Result<Vec<Product>> {
        let mut products = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .request(Method::GET, &self.documents_url())?
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }
            let page: ListResponse = self.send_json(req)?;
            tracing::debug!(count = page.documents.len(), "fetched product page");
            for doc in page.documents {
                products.push(Product::try_from(doc)?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(products)
    }

    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let req = self.request(Method::GET, &self.document_url(id))?;
        match self.send_json::<Document>(req) {
            Ok(doc) => Ok(Some(doc.try_into()?)),
            Err(e) if e.is_api_status(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update_images(&self, id: &str, images: &[String]) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("images".into(), encode_string_array(images));
        let req = self
            .request(Method::PATCH, &self.document_url(id))?
            .query(&[
                ("updateMask.fieldPaths", "images"),
                ("currentDocument.exists", "true"),
            ])
            .json(&ImagesPatch { fields });
        match self.send(req) {
            Ok(_) => Ok(()),
            Err(e) if e.is_api_status(404) => Err(AdminError::ProductNotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }
}
