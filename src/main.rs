#![allow(non_snake_case)]
use RustedSDC::Examples::sdc_examples::sdc_examples;

fn main() {
    let example = 1;
    sdc_examples(example);
}
