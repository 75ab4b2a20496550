pub mod dry_run;
