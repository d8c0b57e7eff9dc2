pub mod alpha;
pub mod casefold;
pub mod stemmer;
pub mod stopword;
