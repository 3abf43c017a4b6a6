mod builtins;
mod concurrency;
mod lifecycle;
mod synchronize;
