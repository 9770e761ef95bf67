use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Length of generated user ids
const ID_LENGTH: usize = 16;

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Returns a new opaque user id
pub fn random_id() -> String {
    random_string(ID_LENGTH)
}
