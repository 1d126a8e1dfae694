//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了对外响应的统一格式和结果码表。
//!
//! 结果码表在编译期确定，运行时只读；调用方只会看到成功、参数错误
//! 或单一的“后端操作失败”，不会暴露内部错误细节。

use crate::error::{Error, Result};
use crate::model::ArticlePage;
use serde::Serialize;

/// 结果码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode {
    code: i32,
    message: &'static str,
}

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode::new(0, "SUCCESS");
    pub const FAIL: ResultCode = ResultCode::new(500, "FAIL");
    pub const INVALID_REQUEST: ResultCode = ResultCode::new(1001, "invalid request parameters");
    pub const BACKEND_FAILURE: ResultCode = ResultCode::new(1002, "backend operation failed");

    /// 全部已定义的结果码
    pub const ALL: &'static [ResultCode] = &[
        Self::SUCCESS,
        Self::FAIL,
        Self::INVALID_REQUEST,
        Self::BACKEND_FAILURE,
    ];

    const fn new(code: i32, message: &'static str) -> Self {
        Self { code, message }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    /// 按数值查找结果码
    pub fn lookup(code: i32) -> Option<&'static ResultCode> {
        Self::ALL.iter().find(|r| r.code == code)
    }

    /// 把内部错误归类为对外结果码
    pub fn for_error(err: &Error) -> &'static ResultCode {
        match err {
            Error::InvalidRequest(_) => &Self::INVALID_REQUEST,
            _ => &Self::BACKEND_FAILURE,
        }
    }
}

/// 响应信封
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub fn success(data: T) -> Self {
        Self::with_code(&ResultCode::SUCCESS, Some(data))
    }

    pub fn with_code(result: &ResultCode, data: Option<T>) -> Self {
        Self {
            code: result.code(),
            message: result.message().to_string(),
            data,
        }
    }

    /// 由操作结果构造响应，错误只保留结果码
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::with_code(ResultCode::for_error(&e), None),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::SUCCESS.code()
    }
}

/// 分页数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub data: Vec<T>,
}

impl PageResult<crate::model::ArticleSummary> {
    pub fn from_page(page: u64, size: u64, result: ArticlePage) -> Self {
        Self {
            page,
            size,
            total: result.total,
            data: result.articles,
        }
    }
}
