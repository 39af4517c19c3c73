mod test_join_and_leave;
