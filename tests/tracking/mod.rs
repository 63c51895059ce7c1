mod derivatives;
mod optical;
mod simulator;
mod tdrss;
mod two_way;
