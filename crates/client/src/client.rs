// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP client for the explorer and table APIs.

use crate::decode::{Column, DecodeOptions};
use crate::error::{ClientError, DecodeError};
use crate::models::{Block, BlockColumn, BlockList, ContractScript, ContractTypes, Op, OpColumn, OpList};
use crate::query::{BlockParams, OpParams, TableQuery};
use crate::resolver::{ContractResolver, ScriptCache};
use crate::types::{Address, BlockHash, OpHash};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tzstats_config::{ApiConfig, ExplorerConfig};
use url::Url;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Explorer client. Owns the contract script cache shared by all queries.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    options: DecodeOptions,
    cache: ScriptCache,
}

impl Client {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|source| ClientError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| ClientError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            options: DecodeOptions::default(),
            cache: ScriptCache::new(),
        })
    }

    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ClientError> {
        Ok(Self::new(&config.api)?.with_options(DecodeOptions::from(&config.decode)))
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    pub fn cache(&self) -> &ScriptCache {
        &self.cache
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        Url::parse(&url).map_err(|source| ClientError::InvalidUrl { url, source })
    }

    /// GET `path` and parse the body as JSON. Cancelling aborts the request.
    pub async fn get_json(&self, path: &str, cancel: &CancellationToken) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "GET");
        let mut request = self.http.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let url = url.to_string();
        let fetch = async {
            let http_err = |source| ClientError::Http {
                url: url.clone(),
                source,
            };
            let response = request.send().await.map_err(http_err)?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ClientError::NotFound(url.clone()));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ClientError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                    body,
                });
            }
            let body = response.bytes().await.map_err(http_err)?;
            let value: Value = serde_json::from_slice(&body).map_err(DecodeError::from)?;
            Ok::<Value, ClientError>(value)
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = fetch => result,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, cancel: &CancellationToken) -> Result<T, ClientError> {
        let value = self.get_json(path, cancel).await?;
        Ok(serde_json::from_value(value).map_err(DecodeError::from)?)
    }

    pub async fn get_op(
        &self,
        hash: &OpHash,
        params: &OpParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<Op>, ClientError> {
        let path = params.append_to(&format!("/explorer/op/{hash}"))?;
        self.get(&path, cancel).await
    }

    pub async fn get_block(
        &self,
        hash: &BlockHash,
        params: &BlockParams,
        cancel: &CancellationToken,
    ) -> Result<Block, ClientError> {
        let path = params.append_to(&format!("/explorer/block/{hash}"))?;
        self.get(&path, cancel).await
    }

    pub async fn get_block_height(
        &self,
        height: i64,
        params: &BlockParams,
        cancel: &CancellationToken,
    ) -> Result<Block, ClientError> {
        let path = params.append_to(&format!("/explorer/block/{height}"))?;
        self.get(&path, cancel).await
    }

    pub async fn get_block_with_ops(
        &self,
        hash: &BlockHash,
        params: &BlockParams,
        cancel: &CancellationToken,
    ) -> Result<Block, ClientError> {
        let path = params.append_to(&format!("/explorer/block/{hash}/op"))?;
        self.get(&path, cancel).await
    }

    pub async fn get_block_ops(
        &self,
        hash: &BlockHash,
        params: &OpParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<Op>, ClientError> {
        let path = params.append_to(&format!("/explorer/block/{hash}/operations"))?;
        self.get(&path, cancel).await
    }

    pub async fn get_contract_script(
        &self,
        address: &Address,
        cancel: &CancellationToken,
    ) -> Result<ContractScript, ClientError> {
        self.get(&format!("/explorer/contract/{address}/script"), cancel)
            .await
    }

    /// Run a query against the `op` table. Without explicit columns the
    /// default (non-notable) column set is requested.
    pub async fn query_ops(&self, query: TableQuery, cancel: &CancellationToken) -> Result<OpList, ClientError> {
        let mut query = query;
        query.table = "op".to_string();
        if query.columns.is_empty() {
            query = query.with_columns(&OpColumn::default_names());
        }
        let data = self.get_json(&query.path()?, cancel).await?;
        OpList::decode(&data, &query.columns, self.options, self, cancel).await
    }

    pub async fn query_blocks(
        &self,
        query: TableQuery,
        cancel: &CancellationToken,
    ) -> Result<BlockList, ClientError> {
        let mut query = query;
        query.table = "block".to_string();
        if query.columns.is_empty() {
            query = query.with_columns(&BlockColumn::default_names());
        }
        let data = self.get_json(&query.path()?, cancel).await?;
        Ok(BlockList::decode(&data, &query.columns)?)
    }
}

impl ContractResolver for Client {
    fn resolve(
        &self,
        address: &Address,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Arc<ContractTypes>, ClientError>> + Send {
        async move {
            if let Some(types) = self.cache.get(address) {
                tracing::trace!(contract = %address, "script cache hit");
                return Ok(types);
            }
            tracing::trace!(contract = %address, "script cache miss");
            let script = self.get_contract_script(address, cancel).await?;
            let types = Arc::new(script.types());
            self.cache.insert(*address, types.clone());
            Ok(types)
        }
    }
}
