use rand::Rng;
use rand::distributions::Alphanumeric;

pub const CODE_LENGTH: usize = 8;

/// Produces candidate join codes. Uniqueness is not this trait's concern;
/// `ClassroomService` probes the store and retries on collision.
pub trait JoinCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 8-character uppercase alphanumeric codes from the thread-local RNG.
pub struct RandomCodeGenerator;

impl JoinCodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .map(char::from)
            .collect::<String>()
            .to_uppercase()
    }
}
