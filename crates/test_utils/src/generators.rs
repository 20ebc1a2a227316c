//! Random test data generators

use fake::faker::name::en::Name;
use fake::{Fake, Faker};

use crate::authors::Author;

/// Generates an author with a random name and date of birth, identity and
/// audit fields left for the backing to assign
pub fn random_author() -> Author {
    Author {
        name: Some(Name().fake()),
        dob: Some(Faker.fake()),
        ..Default::default()
    }
}

/// Generates `count` random authors
pub fn random_authors(count: usize) -> Vec<Author> {
    (0..count).map(|_| random_author()).collect()
}
