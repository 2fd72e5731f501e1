mod property_roundtrip;
mod property_tokenizer;
