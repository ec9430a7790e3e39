//! Tool-invocation adapter.
//!
//! Exposes the lending engine as named tools taking JSON arguments. Each tool
//! maps onto exactly one engine operation; arguments are validated with the
//! same request types the HTTP handlers use and nothing else happens here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{BookQuery, CreateBook, CreateMember, LoanRequest, MemberQuery, UpdateBook, UpdateMember},
    services::LendingEngine,
};

/// Arguments naming a single book
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate, ToSchema)]
pub struct BookRef {
    #[validate(range(min = 1, message = "book_id must be positive"))]
    pub book_id: i32,
}

/// Arguments naming a single member
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate, ToSchema)]
pub struct MemberRef {
    #[validate(range(min = 1, message = "member_id must be positive"))]
    pub member_id: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateBookArgs {
    #[validate(range(min = 1, message = "book_id must be positive"))]
    pub book_id: i32,
    #[serde(flatten)]
    #[validate(nested)]
    pub changes: UpdateBook,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateMemberArgs {
    #[validate(range(min = 1, message = "member_id must be positive"))]
    pub member_id: i32,
    #[serde(flatten)]
    #[validate(nested)]
    pub changes: UpdateMember,
}

/// A tool call as received from a caller
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub arguments: Value,
}

/// Result of a successful tool call
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolOutput {
    pub tool: String,
    #[schema(value_type = Object)]
    pub result: Value,
}

/// Description of one tool for discovery
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
}

/// Every tool, with its typed arguments
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    ListBooks(BookQuery),
    GetBook(BookRef),
    AddBook(CreateBook),
    UpdateBook(UpdateBookArgs),
    DeleteBook(BookRef),
    ListMembers(MemberQuery),
    GetMember(MemberRef),
    RegisterMember(CreateMember),
    UpdateMember(UpdateMemberArgs),
    DeleteMember(MemberRef),
    BorrowBook(LoanRequest),
    ReturnBook(LoanRequest),
    ListLoans(MemberRef),
    CheckFines(MemberRef),
    SettleFines(MemberRef),
}

const TOOLS: &[(&str, &str)] = &[
    ("list_books", "List books, optionally filtered by title, author, genre or availability"),
    ("get_book", "Get one book by id"),
    ("add_book", "Add a book to the catalog with all copies available"),
    ("update_book", "Update a book's details or total copies"),
    ("delete_book", "Delete a book that has no loans"),
    ("list_members", "List members, optionally filtered by name, email or status"),
    ("get_member", "Get a member with loan history and fines"),
    ("register_member", "Register a new member"),
    ("update_member", "Update a member's name, email or active status"),
    ("delete_member", "Delete a member without open loans or unpaid fines"),
    ("borrow_book", "Lend a book to a member for the loan period"),
    ("return_book", "Return a borrowed book and compute any overdue fine"),
    ("list_loans", "List a member's open loans"),
    ("check_fines", "Show a member's outstanding and accruing fines"),
    ("settle_fines", "Mark a member's outstanding fines as paid"),
];

fn schema_of<T: for<'a> ToSchema<'a>>() -> Value {
    serde_json::to_value(T::schema().1).unwrap_or(Value::Null)
}

fn input_schema(name: &str) -> Value {
    match name {
        "list_books" => schema_of::<BookQuery>(),
        "get_book" | "delete_book" => schema_of::<BookRef>(),
        "add_book" => schema_of::<CreateBook>(),
        "update_book" => schema_of::<UpdateBookArgs>(),
        "list_members" => schema_of::<MemberQuery>(),
        "register_member" => schema_of::<CreateMember>(),
        "update_member" => schema_of::<UpdateMemberArgs>(),
        "borrow_book" | "return_book" => schema_of::<LoanRequest>(),
        _ => schema_of::<MemberRef>(),
    }
}

/// All tools this adapter exposes
pub fn tool_definitions() -> Vec<ToolDefinition> {
    TOOLS
        .iter()
        .map(|(name, description)| ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: input_schema(name),
        })
        .collect()
}

impl ToolCall {
    /// Resolve a name and raw arguments into a typed call
    pub fn parse(invocation: ToolInvocation) -> AppResult<Self> {
        if !TOOLS.iter().any(|(name, _)| *name == invocation.name) {
            return Err(AppError::UnknownTool(invocation.name));
        }

        let arguments = match invocation.arguments {
            Value::Null => json!({}),
            other => other,
        };

        serde_json::from_value(json!({ "name": invocation.name, "arguments": arguments }))
            .map_err(|e| AppError::Validation(format!("invalid arguments for {}: {}", invocation.name, e)))
    }

    pub fn validate(&self) -> AppResult<()> {
        match self {
            ToolCall::ListBooks(_) => Ok(()),
            ToolCall::GetBook(args) | ToolCall::DeleteBook(args) => Ok(args.validate()?),
            ToolCall::AddBook(args) => Ok(args.validate()?),
            ToolCall::UpdateBook(args) => Ok(args.validate()?),
            ToolCall::ListMembers(args) => Ok(args.validate()?),
            ToolCall::RegisterMember(args) => Ok(args.validate()?),
            ToolCall::UpdateMember(args) => Ok(args.validate()?),
            ToolCall::BorrowBook(args) | ToolCall::ReturnBook(args) => Ok(args.validate()?),
            ToolCall::GetMember(args)
            | ToolCall::DeleteMember(args)
            | ToolCall::ListLoans(args)
            | ToolCall::CheckFines(args)
            | ToolCall::SettleFines(args) => Ok(args.validate()?),
        }
    }
}

fn to_json<T: Serialize>(value: T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("failed to encode tool result: {}", e)))
}

/// Run one tool call against the engine
pub async fn call_tool(engine: &LendingEngine, invocation: ToolInvocation) -> AppResult<ToolOutput> {
    let tool = invocation.name.clone();
    let call = ToolCall::parse(invocation)?;
    call.validate()?;

    tracing::debug!("Tool call: {}", tool);

    let result = match call {
        ToolCall::ListBooks(query) => to_json(engine.list_books(&query).await?)?,
        ToolCall::GetBook(args) => to_json(engine.get_book(args.book_id).await?)?,
        ToolCall::AddBook(book) => to_json(engine.create_book(book).await?)?,
        ToolCall::UpdateBook(args) => to_json(engine.update_book(args.book_id, args.changes).await?)?,
        ToolCall::DeleteBook(args) => {
            engine.delete_book(args.book_id).await?;
            json!({ "deleted": true, "book_id": args.book_id })
        }
        ToolCall::ListMembers(query) => to_json(engine.list_members(&query).await?)?,
        ToolCall::GetMember(args) => to_json(engine.get_member(args.member_id).await?)?,
        ToolCall::RegisterMember(member) => to_json(engine.register_member(member).await?)?,
        ToolCall::UpdateMember(args) => to_json(engine.update_member(args.member_id, args.changes).await?)?,
        ToolCall::DeleteMember(args) => {
            engine.delete_member(args.member_id).await?;
            json!({ "deleted": true, "member_id": args.member_id })
        }
        ToolCall::BorrowBook(args) => to_json(engine.borrow(args.member_id, args.book_id).await?)?,
        ToolCall::ReturnBook(args) => to_json(engine.return_book(args.member_id, args.book_id).await?)?,
        ToolCall::ListLoans(args) => to_json(engine.list_loans(args.member_id).await?)?,
        ToolCall::CheckFines(args) => to_json(engine.check_fines(args.member_id).await?)?,
        ToolCall::SettleFines(args) => to_json(engine.settle_fines(args.member_id).await?)?,
    };

    Ok(ToolOutput { tool, result })
}
