pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Fetch failed: {message}")]
	TransientFetch { message: String },
	#[error("Mutation rejected: {message}")]
	MutationRejected { message: String },
	#[error("Mutation failed: {message}")]
	MutationFailed { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
